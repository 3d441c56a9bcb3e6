//! Conversion of quantities and recipes to a regional [`System`]

use serde::{Deserialize, Serialize};

use super::{ConvertError, ConvertValue, Converter, System};
use crate::{model::Recipe, quantity::Quantity};

/// What to do with the equivalents of a quantity when it's converted
///
/// Equivalents are the other ways the same amount was written, like the
/// `3.5%oz` in `{100%g|3.5%oz}`.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum EquivalentsPolicy {
    /// Keep every original expression, the old primary becomes an equivalent
    #[default]
    Keep,
    /// Drop the old primary and the equivalents already usable in the target
    Replace,
    /// Drop all the equivalents
    Remove,
}

impl Converter {
    /// Converts a quantity to the best unit of a [`System`]
    ///
    /// `context` is the system the quantity was written for, used to size
    /// ambiguous units. The result has no equivalents.
    pub fn convert_to_system(
        &self,
        quantity: &Quantity,
        system: System,
        context: Option<System>,
    ) -> Result<Quantity, ConvertError> {
        let unit_text = quantity.unit_text().ok_or(ConvertError::NoUnit)?;
        let unit = self.unit_index.get_unit_id(unit_text)?;
        let unit = &self.all_units[unit];
        let from = context.unwrap_or(self.default_system);

        let base = ConvertValue::try_from(&quantity.value)?.map(|v| v * unit.ratio_for(from));
        let best = self
            .best_fit(base.first(), unit.physical_quantity, system, system, &[])
            .ok_or(ConvertError::BestUnitNotFound {
                physical_quantity: unit.physical_quantity,
                system,
            })?;
        let value = self.value_in_unit(&base, best, system);
        Ok(Quantity::new(value, Some(best.symbol().to_string())))
    }

    /// Converts a quantity to a given unit
    ///
    /// The value is rounded the way the target unit is shown.
    pub fn convert_to_unit(
        &self,
        quantity: &Quantity,
        unit: &str,
        context: Option<System>,
    ) -> Result<Quantity, ConvertError> {
        let from_text = quantity.unit_text().ok_or(ConvertError::NoUnit)?;
        let from = &self.all_units[self.unit_index.get_unit_id(from_text)?];
        let to = &self.all_units[self.unit_index.get_unit_id(unit)?];
        if from.physical_quantity != to.physical_quantity {
            return Err(ConvertError::MixedQuantities {
                from: from.physical_quantity,
                to: to.physical_quantity,
            });
        }
        let system = context.unwrap_or(self.default_system);

        let base = ConvertValue::try_from(&quantity.value)?.map(|v| v * from.ratio_for(system));
        let value = self.value_in_unit(&base, to, system);
        Ok(Quantity::new(value, Some(unit.trim().to_string())))
    }

    fn is_usable_in(&self, quantity: &Quantity, system: System) -> bool {
        quantity
            .unit_text()
            .and_then(|u| self.find_unit(u))
            .is_some_and(|u| u.is_compatible_with(system))
    }

    /// Converts a quantity in place to `target`
    ///
    /// - A primary that is already usable in `target` is kept.
    /// - Otherwise the first usable equivalent is promoted to primary.
    /// - Otherwise the primary is converted to the best unit of `target`.
    ///
    /// Quantities that can't be converted, like text or unknown units, are
    /// left as they are.
    #[tracing::instrument(level = "trace", skip_all, fields(quantity = %quantity))]
    pub(crate) fn convert_quantity(
        &self,
        quantity: &mut Quantity,
        target: System,
        policy: EquivalentsPolicy,
        context: Option<System>,
    ) {
        if self.is_usable_in(quantity, target) {
            apply_policy(self, quantity, None, target, policy);
            return;
        }

        if let Some(pos) = quantity
            .equivalents
            .iter()
            .position(|eq| self.is_usable_in(eq, target))
        {
            let mut equivalents = std::mem::take(&mut quantity.equivalents);
            let promoted = equivalents.remove(pos);
            let old = std::mem::replace(quantity, promoted);
            quantity.equivalents = equivalents;
            apply_policy(self, quantity, Some(old), target, policy);
            return;
        }

        match self.convert_to_system(quantity, target, context) {
            Ok(converted) => {
                let old = std::mem::replace(quantity, converted);
                let Quantity {
                    value,
                    unit,
                    equivalents,
                } = old;
                quantity.equivalents = equivalents;
                apply_policy(self, quantity, Some(Quantity::new(value, unit)), target, policy);
            }
            Err(e) => {
                tracing::trace!("'{quantity}' not converted: {e}");
            }
        }
    }
}

/// Decides which equivalents survive after the primary changed
///
/// `old` is the replaced primary, if any. With [`EquivalentsPolicy::Keep`] it
/// goes first in the equivalents.
fn apply_policy(
    converter: &Converter,
    quantity: &mut Quantity,
    old: Option<Quantity>,
    target: System,
    policy: EquivalentsPolicy,
) {
    match policy {
        EquivalentsPolicy::Keep => {
            if let Some(mut old) = old {
                old.equivalents.clear();
                quantity.equivalents.insert(0, old);
            }
        }
        EquivalentsPolicy::Replace => {
            quantity
                .equivalents
                .retain(|eq| !converter.is_usable_in(eq, target));
        }
        EquivalentsPolicy::Remove => quantity.equivalents.clear(),
    }
}

impl Recipe {
    /// Converts every ingredient quantity to a regional [`System`]
    ///
    /// Returns a new recipe with [`Recipe::system`] set to `system` and the
    /// totals recomputed. Cookware and timers are not changed.
    ///
    /// ```
    /// # use cooklang_parser::{CooklangParser, convert::{System, EquivalentsPolicy}};
    /// let parser = CooklangParser::default();
    /// let recipe = parser.parse("Add @milk{2%cups|473%ml}.").unwrap();
    /// let metric = recipe
    ///     .convert_to(System::Metric, EquivalentsPolicy::Keep, parser.converter())
    ///     .unwrap();
    /// assert_eq!(metric.ingredients[0].quantity_total.to_string(), "473 ml");
    /// ```
    #[tracing::instrument(level = "debug", skip(self, converter))]
    pub fn convert_to(
        &self,
        system: System,
        policy: EquivalentsPolicy,
        converter: &Converter,
    ) -> Result<Recipe, ConvertError> {
        let mut recipe = self.clone();
        let context = self.system;
        for r in recipe.ingredient_refs_mut() {
            if let Some(q) = &mut r.quantity {
                converter.convert_quantity(q, system, policy, context);
            }
        }
        recipe.system = Some(system);
        recipe.metadata.set_unit_system(system);
        crate::analysis::recompute_totals(&mut recipe, converter)?;
        Ok(recipe)
    }
}
