//! Support for recipe scaling

use thiserror::Error;

use crate::{
    analysis::recompute_totals, convert::Converter, model::Recipe, quantity::QuantityAddError,
};

/// Errors while scaling a recipe
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScaleError {
    #[error("The recipe has no servings to scale from")]
    MissingServings,

    #[error("Invalid scaling factor: {0}")]
    InvalidFactor(f64),

    #[error(transparent)]
    Quantity(#[from] QuantityAddError),
}

impl Recipe {
    /// Scale a recipe
    ///
    /// Returns a new recipe where every scalable ingredient quantity, and its
    /// equivalents, is multiplied by `factor`. Quantities written with a
    /// leading `=` are kept. Totals are calculated again, and
    /// [`Recipe::servings`] and the servings metadata are updated.
    ///
    /// When the recipe has no servings, it's considered to be for 1.
    ///
    /// ```
    /// # use cooklang_parser::CooklangParser;
    /// let parser = CooklangParser::default();
    /// let recipe = parser.parse(">> servings: 2\nMix @flour{100%g} and @salt{=1%pinch}.").unwrap();
    /// let double = recipe.scale_by(2.0, parser.converter()).unwrap();
    /// assert_eq!(double.ingredients[0].quantity_total.to_string(), "200 g");
    /// assert_eq!(double.ingredients[1].quantity_total.to_string(), "1 pinch");
    /// assert_eq!(double.servings, Some(4.0));
    /// ```
    #[tracing::instrument(level = "debug", skip(self, converter))]
    pub fn scale_by(&self, factor: f64, converter: &Converter) -> Result<Recipe, ScaleError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ScaleError::InvalidFactor(factor));
        }

        let mut recipe = self.clone();
        for r in recipe.ingredient_refs_mut() {
            if !r.scalable {
                continue;
            }
            if let Some(q) = &mut r.quantity {
                q.scale(factor);
            }
        }
        recompute_totals(&mut recipe, converter)?;

        recipe.servings = Some(self.servings.unwrap_or(1.0) * factor);
        recipe.metadata.scale_servings(factor);
        Ok(recipe)
    }

    /// Scale a recipe to a number of servings
    ///
    /// The recipe must have servings, from the `servings`, `serves` or `yield`
    /// metadata.
    pub fn scale_to(&self, servings: f64, converter: &Converter) -> Result<Recipe, ScaleError> {
        let base = self.servings.ok_or(ScaleError::MissingServings)?;
        if !servings.is_finite() || servings <= 0.0 || base <= 0.0 {
            return Err(ScaleError::InvalidFactor(servings / base));
        }
        self.scale_by(servings / base, converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::PullParser, quantity::TotalQuantity};
    use test_case::test_case;

    fn parse(input: &str) -> Recipe {
        crate::analysis::parse_events(PullParser::new(input), &Converter::empty()).unwrap()
    }

    #[test_case(0.0; "zero")]
    #[test_case(-1.0; "negative")]
    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "infinite")]
    fn invalid_factor(factor: f64) {
        let recipe = parse("@egg{1}");
        assert!(matches!(
            recipe.scale_by(factor, &Converter::empty()),
            Err(ScaleError::InvalidFactor(_))
        ));
    }

    #[test]
    fn missing_servings() {
        let recipe = parse("@egg{1}");
        assert_eq!(
            recipe.scale_to(4.0, &Converter::empty()),
            Err(ScaleError::MissingServings)
        );
    }

    #[test]
    fn identity() {
        let recipe = parse("@egg{1} @&egg{1/2} @milk{100%ml|1/2%cup}");
        let scaled = recipe.scale_by(1.0, &Converter::empty()).unwrap();
        assert_eq!(scaled.ingredients, recipe.ingredients);
        assert_eq!(scaled.sections, recipe.sections);
    }

    #[test]
    fn does_not_change_original() {
        let recipe = parse(">> servings: 2\n@egg{2}");
        let scaled = recipe.scale_to(3.0, &Converter::empty()).unwrap();
        assert_eq!(
            scaled.ingredients[0].quantity_total,
            TotalQuantity::Single(crate::quantity::Quantity::new(3.0.into(), None))
        );
        assert_eq!(scaled.servings, Some(3.0));
        assert_eq!(recipe.servings, Some(2.0));
        assert_eq!(
            recipe.ingredients[0].quantity_total,
            TotalQuantity::Single(crate::quantity::Quantity::new(2.0.into(), None))
        );
    }
}
