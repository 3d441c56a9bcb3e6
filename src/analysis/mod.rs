//! Builds a [`Recipe`] from parser [`Event`]s
//!
//! This is where references are resolved and the quantities of each
//! ingredient are added together.

use crate::convert::Converter;
use crate::metadata::Metadata;
use crate::model::*;
use crate::parser::{self, Event, Modifiers, ParserError};
use crate::quantity::{QuantityAddError, TotalQuantity, TryAdd, Value};

/// Modifiers a reference has to share with its definition
const MUST_MATCH: Modifiers = Modifiers::OPT.union(Modifiers::HIDDEN);

/// Takes an iterator of [events](`Event`) and converts it to a full recipe.
///
/// Probably the iterator you want is an instance of
/// [`PullParser`](crate::parser::PullParser). The first error stops the
/// process, there are no partial results.
#[tracing::instrument(level = "debug", skip_all)]
pub fn parse_events(
    events: impl Iterator<Item = Event>,
    converter: &Converter,
) -> Result<Recipe, ParserError> {
    let col = RecipeCollector {
        converter,
        content: Recipe::default(),
        current_section: Section::default(),
        items: Vec::new(),
        step_counter: 1,
    };
    col.parse_events(events)
}

struct RecipeCollector<'c> {
    converter: &'c Converter,

    content: Recipe,
    current_section: Section,
    items: Vec<Item>,
    step_counter: u32,
}

impl RecipeCollector<'_> {
    fn parse_events(mut self, events: impl Iterator<Item = Event>) -> Result<Recipe, ParserError> {
        for event in events {
            match event {
                Event::Frontmatter(yaml) => {
                    let (yaml, line) = yaml.take_pair();
                    let metadata = Metadata::from_yaml(&yaml).map_err(|e| {
                        ParserError::InvalidFrontmatter {
                            message: e.to_string(),
                            line,
                        }
                    })?;
                    self.content.metadata.map.extend(metadata.map);
                    self.refresh_from_metadata();
                }
                Event::Metadata { key, value, .. } => {
                    self.content.metadata.insert_str(&key, &value);
                    self.refresh_from_metadata();
                }
                Event::Section { name } => {
                    if self.current_section.is_empty() {
                        self.current_section.name = name;
                    } else {
                        let old = std::mem::replace(&mut self.current_section, Section::new(name));
                        self.content.sections.push(old);
                    }
                    self.step_counter = 1;
                }
                Event::StartStep => self.items.clear(),
                Event::EndStep => {
                    if !self.items.is_empty() {
                        let items = std::mem::take(&mut self.items);
                        self.current_section.content.push(Content::Step(Step {
                            items,
                            number: self.step_counter,
                        }));
                        self.step_counter += 1;
                    }
                }
                Event::Note(text) => self.current_section.content.push(Content::Note(text)),
                Event::Text(text) => self.text(text),
                Event::Ingredient(item) => {
                    let (item, line) = item.take_pair();
                    let parser::IngredientItem {
                        group,
                        alternatives,
                    } = item;
                    let alternatives = alternatives
                        .into_iter()
                        .map(|igr| self.ingredient(igr, line))
                        .collect::<Result<Vec<_>, _>>()?;
                    if let Some(key) = &group {
                        let entry = self.content.groups.entry(key.clone()).or_default();
                        for r in &alternatives {
                            if !entry.contains(&r.index) {
                                entry.push(r.index);
                            }
                        }
                    }
                    self.items.push(Item::Ingredient {
                        alternatives,
                        group,
                    });
                }
                Event::Cookware(cw) => {
                    let (cw, line) = cw.take_pair();
                    let item = self.cookware(cw, line)?;
                    self.items.push(item);
                }
                Event::Timer(timer) => {
                    let index = self.timer(timer.into_inner());
                    self.items.push(Item::Timer { index });
                }
                Event::Error(e) => return Err(e),
            }
        }

        if !self.current_section.is_empty() {
            self.content.sections.push(self.current_section);
        }
        Ok(self.content)
    }

    fn refresh_from_metadata(&mut self) {
        self.content.servings = self.content.metadata.servings();
        self.content.system = self.content.metadata.unit_system();
    }

    fn text(&mut self, text: String) {
        if let Some(Item::Text { value }) = self.items.last_mut() {
            value.push_str(&text);
        } else {
            self.items.push(Item::Text { value: text });
        }
    }

    fn ingredient(
        &mut self,
        igr: parser::Ingredient,
        line: usize,
    ) -> Result<IngredientRef, ParserError> {
        let parser::Ingredient {
            modifiers,
            name,
            recipe_path,
            quantity,
            scalable,
            preparation,
        } = igr;

        if !modifiers.is_reference() {
            self.content.ingredients.push(Ingredient {
                name,
                quantity_total: quantity
                    .clone()
                    .map(TotalQuantity::Single)
                    .unwrap_or_default(),
                preparation,
                recipe_path,
                modifiers,
            });
            return Ok(IngredientRef {
                index: self.content.ingredients.len() - 1,
                quantity,
                scalable,
            });
        }

        let index = find_by_name(&self.content.ingredients, &name, |i| &i.name).ok_or_else(
            || ParserError::ReferenceNotFound {
                kind: "ingredient",
                name: name.clone(),
                line,
            },
        )?;

        let definition = &mut self.content.ingredients[index];
        if definition.modifiers & MUST_MATCH != modifiers & MUST_MATCH {
            return Err(ParserError::ReferencedItemCannotBeRedefined {
                kind: "ingredient",
                name,
                line,
            });
        }

        if let Some(q) = &quantity {
            definition
                .quantity_total
                .add(q, self.converter, self.content.system)
                .map_err(|source| ParserError::Quantity { source, line })?;
        }

        Ok(IngredientRef {
            index,
            quantity,
            scalable,
        })
    }

    fn cookware(&mut self, cw: parser::Cookware, line: usize) -> Result<Item, ParserError> {
        let parser::Cookware {
            modifiers,
            name,
            quantity,
        } = cw;

        if !modifiers.is_reference() {
            self.content.cookware.push(Cookware {
                name,
                quantity_total: quantity.clone(),
                modifiers,
            });
            return Ok(Item::Cookware {
                index: self.content.cookware.len() - 1,
                quantity,
            });
        }

        let index = find_by_name(&self.content.cookware, &name, |c| &c.name).ok_or_else(|| {
            ParserError::ReferenceNotFound {
                kind: "cookware",
                name: name.clone(),
                line,
            }
        })?;

        let definition = &mut self.content.cookware[index];
        if definition.modifiers & MUST_MATCH != modifiers & MUST_MATCH {
            return Err(ParserError::ReferencedItemCannotBeRedefined {
                kind: "cookware",
                name,
                line,
            });
        }

        if let Some(q) = &quantity {
            let total = match &definition.quantity_total {
                Some(total) => total.try_add(q).map_err(|e| ParserError::Quantity {
                    source: QuantityAddError::TextValue(e),
                    line,
                })?,
                None => q.clone(),
            };
            definition.quantity_total = Some(total);
        }

        Ok(Item::Cookware { index, quantity })
    }

    fn timer(&mut self, timer: parser::Timer) -> usize {
        let parser::Timer {
            name,
            duration,
            unit,
        } = timer;

        let existing = self
            .content
            .timers
            .iter()
            .position(|t| t.name == name && t.duration == duration && t.unit == unit);
        if let Some(index) = existing {
            return index;
        }
        self.content.timers.push(Timer {
            name,
            duration,
            unit,
        });
        self.content.timers.len() - 1
    }
}

/// Most recent item with the same name, ignoring case
fn find_by_name<T>(all: &[T], name: &str, get: impl Fn(&T) -> &String) -> Option<usize> {
    let name = name.to_lowercase();
    all.iter().rposition(|item| get(item).to_lowercase() == name)
}

/// Recalculates the total quantity of every ingredient from its references
///
/// Used after the quantities in the steps change, when scaling or
/// converting.
pub(crate) fn recompute_totals(
    recipe: &mut Recipe,
    converter: &Converter,
) -> Result<(), QuantityAddError> {
    let refs = recipe
        .ingredient_refs()
        .filter_map(|r| r.quantity.clone().map(|q| (r.index, q)))
        .collect::<Vec<_>>();

    for igr in &mut recipe.ingredients {
        igr.quantity_total = TotalQuantity::None;
    }
    for (index, quantity) in refs {
        recipe.ingredients[index]
            .quantity_total
            .add(&quantity, converter, recipe.system)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PullParser;
    use crate::quantity::Quantity;
    use indoc::indoc;

    fn parse(input: &str) -> Result<Recipe, ParserError> {
        parse_events(PullParser::new(input), &Converter::empty())
    }

    #[test]
    fn texts_are_merged() {
        let recipe = parse("first\nsecond").unwrap();
        let step = recipe.sections[0].steps().next().unwrap();
        assert_eq!(
            step.items,
            vec![Item::Text {
                value: "first second".into()
            }]
        );
    }

    #[test]
    fn step_numbers_per_section() {
        let recipe = parse(indoc! {"
            one

            two

            = Next
            three
        "})
        .unwrap();
        let numbers: Vec<Vec<u32>> = recipe
            .sections
            .iter()
            .map(|s| s.steps().map(|s| s.number).collect())
            .collect();
        assert_eq!(numbers, vec![vec![1, 2], vec![1]]);
    }

    #[test]
    fn leading_section_takes_header_name() {
        let recipe = parse("= Only\nstep").unwrap();
        assert_eq!(recipe.sections.len(), 1);
        assert_eq!(recipe.sections[0].name.as_deref(), Some("Only"));
    }

    #[test]
    fn reference_adds_same_unit() {
        let recipe = parse("@flour{100%g} then @&flour{50%g}").unwrap();
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(
            recipe.ingredients[0].quantity_total,
            TotalQuantity::Single(Quantity::new(150.0.into(), Some("g".into())))
        );
    }

    #[test]
    fn reference_not_found() {
        let err = parse("\n@&flour{1}").unwrap_err();
        assert_eq!(
            err,
            ParserError::ReferenceNotFound {
                kind: "ingredient",
                name: "flour".into(),
                line: 2
            }
        );
        assert_eq!(err.to_string(), "Referenced ingredient \"flour\" not found (line 2)");
    }

    #[test]
    fn cookware_amounts() {
        let recipe = parse("#pan{1} and #&pan{2}").unwrap();
        assert_eq!(recipe.cookware[0].quantity_total, Some(Value::from(3.0)));
    }

    #[test]
    fn timers_dedup() {
        let recipe = parse("~{5%min} ~{5%min} ~{5%s}").unwrap();
        assert_eq!(recipe.timers.len(), 2);
    }

    #[test]
    fn groups() {
        let recipe = parse("@|fat|butter{} or @|fat|oil{}").unwrap();
        assert_eq!(recipe.groups["fat"], vec![0, 1]);
    }

    #[test]
    fn old_style_metadata() {
        let recipe = parse(">> servings: 2\n>> unit system: metric\nstep").unwrap();
        assert_eq!(recipe.servings, Some(2.0));
        assert_eq!(recipe.system, Some(crate::convert::System::Metric));
    }
}
