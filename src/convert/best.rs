//! Choosing the unit a value looks best in

use std::sync::Arc;

use super::{ConvertValue, Converter, PhysicalQuantity, System, Unit};
use crate::quantity::{
    approximate_fraction, to_rounded_decimal, Number, Quantity, QuantityAddError, Value,
    DEFAULT_PRECISION,
};

/// Relative distance to the closest integer under which a value is whole
const WHOLE_TOLERANCE: f64 = 1e-4;

fn is_whole(value: f64) -> bool {
    (value - value.round()).abs() <= WHOLE_TOLERANCE * value.abs().max(1.0)
}

/// Lower is better
fn tier(value: f64, unit: &Unit) -> u8 {
    match (unit.range.contains(value), is_whole(value)) {
        (true, true) => 0,
        (true, false) => 1,
        _ => 2,
    }
}

impl Converter {
    /// Selects the unit to show a base value in
    ///
    /// `inputs` are tried before the best units of `system`, so when two
    /// candidates are equally good the input unit is kept. Candidates are
    /// scored in tiers:
    /// 0. whole value inside the natural range of the unit
    /// 1. value inside the natural range
    ///
    /// When no candidate is in range, the largest best unit with a value of
    /// at least 1 is used, or the smallest one if the value is lower than all
    /// of them.
    pub(crate) fn best_fit<'a>(
        &'a self,
        base: f64,
        quantity: PhysicalQuantity,
        system: System,
        ratio_system: System,
        inputs: &[&'a Arc<Unit>],
    ) -> Option<&'a Arc<Unit>> {
        let mut candidates: Vec<&Arc<Unit>> = Vec::with_capacity(inputs.len() + 8);
        for unit in inputs
            .iter()
            .copied()
            .chain(self.best_units(quantity, system))
        {
            if !candidates.iter().any(|c| Arc::ptr_eq(c, unit)) {
                candidates.push(unit);
            }
        }

        let value_in = |unit: &Unit| (base / unit.ratio_for(ratio_system)).abs();

        let best = candidates
            .iter()
            .copied()
            .map(|unit| (tier(value_in(unit), unit), unit))
            .filter(|(tier, _)| *tier < 2)
            .min_by_key(|(tier, _)| *tier)
            .map(|(_, unit)| unit);
        if best.is_some() {
            return best;
        }

        let mut best_units = self.best_units(quantity, system);
        let fallback = self
            .best_units(quantity, system)
            .rev()
            .find(|unit| value_in(unit) >= 1.0)
            .or_else(|| best_units.next());
        tracing::trace!(
            "no unit in range for {base} {quantity}, fallback to {:?}",
            fallback.map(|u| u.symbol())
        );
        fallback.or_else(|| inputs.first().copied())
    }

    /// Expresses a base value in `unit`, rounded the way the unit is shown
    pub(crate) fn value_in_unit(&self, base: &ConvertValue, unit: &Unit, system: System) -> Value {
        let ratio = unit.ratio_for(system);
        match base.map(|v| v / ratio) {
            ConvertValue::Number(n) => Value::Number(display_number(n, unit)),
            ConvertValue::Range(r) => Value::Range {
                start: display_number(*r.start(), unit),
                end: display_number(*r.end(), unit),
            },
        }
    }

    /// Adds two values of known units of the same physical quantity
    ///
    /// The result is in the best unit for the sum. When that unit is one of
    /// the inputs, the text written in the input is kept.
    pub(crate) fn add_in_best_unit(
        &self,
        a: (&Value, &Arc<Unit>, &str),
        b: (&Value, &Arc<Unit>, &str),
        context: Option<System>,
    ) -> Result<Quantity, QuantityAddError> {
        let (a_value, a_unit, a_text) = a;
        let (b_value, b_unit, b_text) = b;

        let ratio_system = context.unwrap_or(self.default_system);
        let system = context.unwrap_or_else(|| self.effective_system(a_unit, b_unit));

        let a_base = ConvertValue::try_from(a_value)?.map(|v| v * a_unit.ratio_for(ratio_system));
        let b_base = ConvertValue::try_from(b_value)?.map(|v| v * b_unit.ratio_for(ratio_system));
        let total = a_base.add(&b_base);

        let unit = self
            .best_fit(
                total.first(),
                a_unit.physical_quantity,
                system,
                ratio_system,
                &[a_unit, b_unit],
            )
            .unwrap_or(a_unit);

        let text = if Arc::ptr_eq(unit, a_unit) {
            a_text.to_string()
        } else if Arc::ptr_eq(unit, b_unit) {
            b_text.to_string()
        } else {
            unit.symbol().to_string()
        };

        let value = self.value_in_unit(&total, unit, ratio_system);
        Ok(Quantity::new(value, Some(text)))
    }
}

/// Rounds a value the way it looks natural in a unit
///
/// - Integer units are rounded to a whole number.
/// - Units with fractions try [`approximate_fraction`] first.
/// - Everything else is rounded with [`to_rounded_decimal`].
pub(crate) fn display_number(value: f64, unit: &Unit) -> Number {
    if unit.integer {
        return Number::Decimal(value.round());
    }
    if let Some(fractions) = &unit.fractions {
        if let Some(f) = approximate_fraction(
            value,
            &fractions.denominators,
            fractions.accuracy,
            fractions.max_whole,
        ) {
            return f;
        }
    }
    Number::Decimal(to_rounded_decimal(value, DEFAULT_PRECISION))
}

#[cfg(all(test, feature = "bundled_units"))]
mod tests {
    use super::*;
    use test_case::test_case;

    fn best(value: f64, unit: &str, system: System) -> String {
        let converter = Converter::bundled();
        let unit = converter.find_unit(unit).unwrap();
        let base = value * unit.ratio_for(system);
        converter
            .best_fit(base, unit.physical_quantity, system, system, &[])
            .unwrap()
            .symbol()
            .to_string()
    }

    #[test_case(1500.0, "g", System::Metric => "kg"; "kilograms")]
    #[test_case(250.0, "g", System::Metric => "g"; "grams")]
    #[test_case(3.0, "tsp", System::Us => "tbsp"; "teaspoons to tablespoon")]
    #[test_case(16.0, "tbsp", System::Us => "c"; "tablespoons to cup")]
    #[test_case(0.5, "tsp", System::Us => "tsp"; "small")]
    #[test_case(40.0, "oz", System::Us => "lb"; "pounds")]
    #[test_case(24.0, "piece", System::Us => "pc"; "pieces")]
    fn best_unit(value: f64, unit: &str, system: System) -> String {
        best(value, unit, system)
    }

    #[test]
    fn fallback_to_largest() {
        let file: crate::convert::UnitsFile = toml::from_str(indoc::indoc! {r#"
            [[quantity]]
            quantity = "mass"
            best = ["a", "b"]
            units = [
                { names = ["a"], ratio = 1.0, range = { min = 1.0, max = 2.0 } },
                { names = ["b"], ratio = 10.0, range = { min = 1.0, max = 2.0 } },
            ]

            [[quantity]]
            quantity = "volume"
            best = ["ml"]
            units = [{ names = ["ml"], ratio = 1.0 }]

            [[quantity]]
            quantity = "count"
            best = ["piece"]
            units = [{ names = ["piece"], ratio = 1.0 }]
        "#})
        .unwrap();
        let converter = Converter::builder()
            .with_units_file(file)
            .and_then(|b| b.finish())
            .unwrap();
        let fit = |base: f64| {
            converter
                .best_fit(base, PhysicalQuantity::Mass, System::Metric, System::Metric, &[])
                .unwrap()
                .symbol()
                .to_string()
        };
        assert_eq!(fit(5.0), "a");
        assert_eq!(fit(50.0), "b");
        assert_eq!(fit(0.5), "a");
        assert_eq!(fit(15.0), "b");
    }

    #[test]
    fn inputs_are_preferred() {
        let converter = Converter::bundled();
        let dl = converter.find_unit("dl").unwrap();
        let unit = converter
            .best_fit(300.0, PhysicalQuantity::Volume, System::Metric, System::Metric, &[&dl])
            .unwrap();
        assert_eq!(unit.symbol(), "dl");
    }

    #[test_case(2.4999, "pc" => Number::Decimal(2.0); "integer unit")]
    #[test_case(1.5, "cup" => Number::Fraction { num: 3, den: 2 }; "fraction")]
    #[test_case(1.1, "cup" => Number::Decimal(1.1); "fraction not accurate")]
    #[test_case(1.23456, "kg" => Number::Decimal(1.23); "decimal")]
    fn display(value: f64, unit: &str) -> Number {
        let converter = Converter::bundled();
        display_number(value, &converter.find_unit(unit).unwrap())
    }

    #[test]
    fn add_ranges() {
        let converter = Converter::bundled();
        let kg = converter.find_unit("kg").unwrap();
        let g = converter.find_unit("g").unwrap();
        let range = Value::Range {
            start: 1.0.into(),
            end: 2.0.into(),
        };
        let sum = converter
            .add_in_best_unit((&range, &kg, "kg"), (&Value::from(500.0), &g, "g"), None)
            .unwrap();
        assert_eq!(
            sum,
            Quantity::new(
                Value::Range {
                    start: 1.5.into(),
                    end: 2.5.into()
                },
                Some("kg".into())
            )
        );
    }

    #[test]
    fn mixed_systems_use_metric() {
        let converter = Converter::bundled();
        let cup = converter.find_unit("cup").unwrap();
        let ml = converter.find_unit("ml").unwrap();
        let sum = converter
            .add_in_best_unit(
                (&Value::from(1.0), &cup, "cup"),
                (&Value::from(100.0), &ml, "ml"),
                Some(System::Metric),
            )
            .unwrap();
        assert_eq!(sum, Quantity::new(Value::from(350.0), Some("ml".into())));
    }
}
