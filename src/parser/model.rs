//! Components as written in a step, before references are resolved

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::quantity::{Quantity, Value};

/// An ingredient token, with all its inline alternatives
///
/// `@flour{200%g}|@oat flour{200%g}` is one item with two alternatives. The
/// first one is the default.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngredientItem {
    /// Group key, from `@|key|name`
    pub group: Option<String>,
    pub alternatives: Vec<Ingredient>,
}

/// A single ingredient option
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Ingredient {
    pub modifiers: Modifiers,
    pub name: String,
    /// Normalized `path/name.cook` for sub-recipes
    pub recipe_path: Option<String>,
    pub quantity: Option<Quantity>,
    /// `false` when the quantity starts with `=`
    pub scalable: bool,
    pub preparation: Option<String>,
}

/// Cookware token
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Cookware {
    pub modifiers: Modifiers,
    pub name: String,
    /// This is just a [`Value`], because cookware cannot have a unit.
    pub quantity: Option<Value>,
}

/// Timer token
///
/// The unit is required.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Timer {
    pub name: Option<String>,
    pub duration: Value,
    pub unit: String,
}

bitflags! {
    /// Component modifiers
    ///
    /// Sadly, for now this can represent invalid combinations of modifiers.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Modifiers: u16 {
        /// refers to a recipe with the same name
        const RECIPE         = 1 << 0;
        /// references another igr with the same name, if amount given will sum
        const REF            = 1 << 1;
        /// not shown in the ingredient list, only inline
        const HIDDEN         = 1 << 2;
        /// mark as optional
        const OPT            = 1 << 3;
        /// forces to create a new ingredient
        const NEW            = 1 << 4;
    }
}

impl Modifiers {
    /// Returns true if the component should be displayed in a list
    pub fn should_be_listed(self) -> bool {
        !self.intersects(Modifiers::HIDDEN | Modifiers::REF)
    }

    pub fn is_hidden(&self) -> bool {
        self.contains(Modifiers::HIDDEN)
    }

    pub fn is_optional(&self) -> bool {
        self.contains(Modifiers::OPT)
    }

    pub fn is_recipe(&self) -> bool {
        self.contains(Modifiers::RECIPE)
    }

    pub fn is_reference(&self) -> bool {
        self.contains(Modifiers::REF)
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for m in Modifier::ALL {
            if self.contains(m.flag()) {
                write!(f, "{}", m.symbol())?;
            }
        }
        Ok(())
    }
}

/// A single modifier, as written before a component name
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Modifier {
    /// `?`
    Optional,
    /// `-`
    Hidden,
    /// `&`
    Reference,
    /// `@`, only for ingredients
    Recipe,
    /// `+`
    New,
}

impl Modifier {
    const ALL: [Modifier; 5] = [
        Modifier::Recipe,
        Modifier::Reference,
        Modifier::Hidden,
        Modifier::Optional,
        Modifier::New,
    ];

    /// Char used to write it
    pub fn symbol(self) -> char {
        match self {
            Modifier::Optional => '?',
            Modifier::Hidden => '-',
            Modifier::Reference => '&',
            Modifier::Recipe => '@',
            Modifier::New => '+',
        }
    }

    pub fn flag(self) -> Modifiers {
        match self {
            Modifier::Optional => Modifiers::OPT,
            Modifier::Hidden => Modifiers::HIDDEN,
            Modifier::Reference => Modifiers::REF,
            Modifier::Recipe => Modifiers::RECIPE,
            Modifier::New => Modifiers::NEW,
        }
    }
}

impl TryFrom<char> for Modifier {
    type Error = char;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        Modifier::ALL
            .into_iter()
            .find(|m| m.symbol() == c)
            .ok_or(c)
    }
}
