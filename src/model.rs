//! Recipe representation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    convert::System,
    metadata::Metadata,
    parser::Modifiers,
    quantity::{Quantity, TotalQuantity, Value},
};

/// A complete recipe
///
/// Everything is owned, so [`Clone`] gives a fully independent copy. Scaling
/// and conversion return new recipes and leave the original untouched.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Clone)]
pub struct Recipe {
    /// Metadata
    pub metadata: Metadata,
    /// Each of the sections
    ///
    /// Content before the first section header belongs to a section without
    /// name.
    pub sections: Vec<Section>,
    /// All the ingredients
    pub ingredients: Vec<Ingredient>,
    /// All the cookware
    pub cookware: Vec<Cookware>,
    /// All the timers
    pub timers: Vec<Timer>,
    /// Ingredient groups
    ///
    /// Every ingredient written as `@|key|name` is an option of the group
    /// `key`. The values are indices into [`Recipe::ingredients`], in the
    /// order they appear.
    pub groups: IndexMap<String, Vec<usize>>,
    /// Number of servings the quantities are for
    pub servings: Option<f64>,
    /// Regional system of the recipe
    ///
    /// Used to resolve ambiguous units, like `cup`. When [`None`], the default
    /// system of the converter is used.
    pub system: Option<System>,
}

impl Recipe {
    /// Iterates over every ingredient reference in the steps, in order
    pub fn ingredient_refs(&self) -> impl Iterator<Item = &IngredientRef> {
        self.sections
            .iter()
            .flat_map(|s| s.steps())
            .flat_map(|s| &s.items)
            .filter_map(|item| match item {
                Item::Ingredient { alternatives, .. } => Some(alternatives),
                _ => None,
            })
            .flatten()
    }

    pub(crate) fn ingredient_refs_mut(&mut self) -> impl Iterator<Item = &mut IngredientRef> {
        self.sections
            .iter_mut()
            .flat_map(|s| &mut s.content)
            .filter_map(|c| match c {
                Content::Step(step) => Some(step),
                Content::Note(_) => None,
            })
            .flat_map(|s| &mut s.items)
            .filter_map(|item| match item {
                Item::Ingredient { alternatives, .. } => Some(alternatives),
                _ => None,
            })
            .flatten()
    }
}

/// A section holding steps and notes
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Clone)]
pub struct Section {
    /// Name of the section
    pub name: Option<String>,
    /// Steps and notes, in order
    pub content: Vec<Content>,
}

impl Section {
    pub(crate) fn new(name: Option<String>) -> Section {
        Self {
            name,
            content: Vec::new(),
        }
    }

    /// Check if the section is empty
    ///
    /// A section is empty when it has no name and no content.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_empty()
    }

    /// Iterates over the steps of the section, skipping notes
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.content.iter().filter_map(|c| match c {
            Content::Step(step) => Some(step),
            Content::Note(_) => None,
        })
    }
}

/// Each type of content inside a section
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Content {
    /// A step
    Step(Step),
    /// A note, lines starting with `>`
    Note(String),
}

impl Content {
    pub fn is_step(&self) -> bool {
        matches!(self, Self::Step(_))
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Self::Note(_))
    }
}

/// A step holding step [`Item`]s
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Step {
    /// [`Item`]s inside, in the same order as the text
    pub items: Vec<Item>,
    /// Step number
    ///
    /// The step numbers start at 1 in each section.
    pub number: u32,
}

/// A step item
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Item {
    /// Just plain text
    Text { value: String },
    /// An ingredient
    ///
    /// Written with `|` between them, the options are alternatives and the
    /// first one is the default.
    Ingredient {
        alternatives: Vec<IngredientRef>,
        /// Group key, from `@|key|name`
        group: Option<String>,
    },
    /// A cookware item
    Cookware {
        /// Index into [`Recipe::cookware`]
        index: usize,
        /// Amount written in this place
        quantity: Option<Value>,
    },
    /// A timer
    Timer {
        /// Index into [`Recipe::timers`]
        index: usize,
    },
}

/// An ingredient written in a step
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct IngredientRef {
    /// Index into [`Recipe::ingredients`]
    pub index: usize,
    /// Amount written in this place
    pub quantity: Option<Quantity>,
    /// `false` when the quantity was written with a leading `=`
    pub scalable: bool,
}

/// A recipe ingredient
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Ingredient {
    /// Name
    ///
    /// For sub-recipes this is the file stem, the full path is in
    /// [`Ingredient::recipe_path`].
    pub name: String,
    /// Sum of every quantity of the ingredient and its references
    pub quantity_total: TotalQuantity,
    /// Preparation text, like `diced` in `@onion{1}(diced)`
    pub preparation: Option<String>,
    /// Relative path to the recipe file, when the ingredient is a recipe
    pub recipe_path: Option<String>,
    pub(crate) modifiers: Modifiers,
}

impl Ingredient {
    /// Access the ingredient modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn is_optional(&self) -> bool {
        self.modifiers.is_optional()
    }

    pub fn is_hidden(&self) -> bool {
        self.modifiers.is_hidden()
    }

    pub fn is_recipe(&self) -> bool {
        self.modifiers.is_recipe()
    }
}

/// A recipe cookware item
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Cookware {
    /// Name
    pub name: String,
    /// Amount needed
    ///
    /// Note that this is a value, not a quantity, so it doesn't have units.
    pub quantity_total: Option<Value>,
    pub(crate) modifiers: Modifiers,
}

impl Cookware {
    /// Access the cookware modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn is_optional(&self) -> bool {
        self.modifiers.is_optional()
    }

    pub fn is_hidden(&self) -> bool {
        self.modifiers.is_hidden()
    }
}

/// A recipe timer
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Timer {
    /// Name
    pub name: Option<String>,
    /// Time value
    pub duration: Value,
    /// Time unit, always present
    pub unit: String,
}

impl Timer {
    /// The duration as a [`Quantity`]
    pub fn quantity(&self) -> Quantity {
        Quantity::new(self.duration.clone(), Some(self.unit.clone()))
    }
}
