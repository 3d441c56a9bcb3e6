//! Support for **configurable** unit conversion
//!
//! This includes:
//! - A layered configuration system
//! - Units that change between regions, like `cup`
//! - Choosing the best unit to show a value
//! - Conversions of a whole recipe to a regional [`System`]

use std::{collections::HashMap, ops::RangeInclusive, sync::Arc};

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quantity::{decimal_add, QuantityAddError, TextValueError, Value};

pub use builder::{ConverterBuilder, ConverterBuilderError};
pub use system::EquivalentsPolicy;
pub use units_file::UnitsFile;

mod best;
mod builder;
mod system;
pub mod units_file;

/// Main struct to perform conversions
///
/// This holds information about all the known units and how to convert them.
///
/// To create one use [`Converter::builder`].
///
/// [`Converter::default`] changes with the feature `bundled_units`:
/// - When enabled, [`Converter::bundled`].
/// - When disabled, [`Converter::empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct Converter {
    all_units: Vec<Arc<Unit>>,
    unit_index: UnitIndex,
    best: EnumMap<PhysicalQuantity, EnumMap<System, BestConversions>>,
    default_system: System,
}

#[cfg(feature = "bundled_units")]
static BUNDLED: once_cell::sync::Lazy<Converter> = once_cell::sync::Lazy::new(|| {
    ConverterBuilder::new()
        .with_units_file(UnitsFile::bundled())
        .and_then(ConverterBuilder::finish)
        .expect("bundled units are valid")
});

impl Converter {
    /// Start to create a new [Converter]
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Empty converter
    ///
    /// This is the default when the `bundled_units` feature is disabled.
    ///
    /// Every unit is unknown to an empty converter, so quantities only add
    /// when their units are written the same.
    pub fn empty() -> Self {
        Self {
            all_units: Default::default(),
            unit_index: Default::default(),
            best: Default::default(),
            default_system: Default::default(),
        }
    }

    /// Converter with the bundled units
    ///
    /// The converter will have the bundled units that doesn't need any external
    /// file. These are the basic units for most of the recipes you will need
    /// (in English).
    ///
    /// The bundled converter is built once and cloned after that.
    ///
    /// This is only available when the `bundled_units` feature is enabled.
    #[cfg(feature = "bundled_units")]
    pub fn bundled() -> Self {
        BUNDLED.clone()
    }

    /// Region used for ambiguous units when there is no other information
    pub fn default_system(&self) -> System {
        self.default_system
    }

    /// Get the total number of known units.
    ///
    /// This is **not** all the known unit names, just **different units**.
    pub fn unit_count(&self) -> usize {
        self.all_units.len()
    }

    /// Get an iterator of all the known units.
    pub fn all_units(&self) -> impl Iterator<Item = &Unit> {
        self.all_units.iter().map(|u| u.as_ref())
    }

    /// Get the best units for a quantity and a system, smallest first.
    pub fn best_units(
        &self,
        quantity: PhysicalQuantity,
        system: System,
    ) -> impl DoubleEndedIterator<Item = &Arc<Unit>> {
        self.best[quantity][system]
            .0
            .iter()
            .map(|&id| &self.all_units[id])
    }

    /// Find a unit by any of it's names, symbols or aliases
    ///
    /// The search ignores case.
    pub fn find_unit(&self, unit: &str) -> Option<Arc<Unit>> {
        let uid = self.unit_index.get_unit_id(unit).ok()?;
        Some(self.all_units[uid].clone())
    }

    /// Checks if two unit texts can be added together
    ///
    /// They can when they are the same text or both are known units of the
    /// same [`PhysicalQuantity`].
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.find_unit(a), self.find_unit(b)) {
            (Some(a), Some(b)) => a.physical_quantity == b.physical_quantity,
            _ => false,
        }
    }

    /// Convert a value between two units
    ///
    /// `system` resolves the size of ambiguous units.
    pub fn convert_f64(
        &self,
        value: f64,
        from: &Unit,
        to: &Unit,
        system: System,
    ) -> Result<f64, ConvertError> {
        if from.physical_quantity != to.physical_quantity {
            return Err(ConvertError::MixedQuantities {
                from: from.physical_quantity,
                to: to.physical_quantity,
            });
        }
        if std::ptr::eq(from, to) {
            return Ok(value);
        }
        Ok(value * from.ratio_for(system) / to.ratio_for(system))
    }

    /// Family of a unit system, mapped to a regional [`System`]
    ///
    /// Imperial and ambiguous units are both read as the non metric default
    /// region.
    fn system_family(&self, system: UnitSystem) -> System {
        match system {
            UnitSystem::Metric => System::Metric,
            UnitSystem::Imperial | UnitSystem::Ambiguous => match self.default_system {
                s @ (System::Us | System::Uk) => s,
                System::Metric | System::Jp => System::Us,
            },
        }
    }

    /// System used to add two units when there is no context
    ///
    /// Metric when the units disagree, the shared system otherwise.
    pub(crate) fn effective_system(&self, a: &Unit, b: &Unit) -> System {
        let a = a.system.map(|s| self.system_family(s));
        let b = b.system.map(|s| self.system_family(s));
        match (a, b) {
            (Some(a), Some(b)) if a == b => a,
            (Some(_), Some(_)) => System::Metric,
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => self.default_system,
        }
    }
}

#[cfg(not(feature = "bundled_units"))]
impl Default for Converter {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(feature = "bundled_units")]
impl Default for Converter {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Lowercase name, symbol or alias to unit id
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct UnitIndex(HashMap<Arc<str>, usize>);

impl UnitIndex {
    fn get_unit_id(&self, key: &str) -> Result<usize, UnknownUnit> {
        self.0
            .get(key.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| UnknownUnit(key.to_string()))
    }
}

/// Best units of a quantity in a system, sorted by size
#[derive(Debug, Clone, Default, PartialEq)]
struct BestConversions(Vec<usize>);

/// A unit
///
/// It implements [Display](std::fmt::Display). It will use [`Self::symbol`] or,
/// if alternate (`#`) is given, it will try the first name.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Unit {
    /// All the names that may be used to format the unit
    pub names: Vec<Arc<str>>,
    /// All the symbols (abbreviations), like `ml` for `millilitres`
    pub symbols: Vec<Arc<str>>,
    /// Custom aliases to parse the unit from a different string
    pub aliases: Vec<Arc<str>>,
    /// Conversion ratio to the base unit, in the default system
    pub ratio: f64,
    /// Conversion ratio per region. Only set for ambiguous units.
    pub ratios: EnumMap<System, Option<f64>>,
    /// The [`PhysicalQuantity`] this unit belongs to
    pub physical_quantity: PhysicalQuantity,
    /// The [`UnitSystem`] this unit belongs to, if any
    pub system: Option<UnitSystem>,
    /// Values in which the unit looks natural
    pub range: NaturalRange,
    /// Show values as fractions
    pub fractions: Option<FractionsConfig>,
    /// Values are always whole numbers
    pub integer: bool,
}

impl Unit {
    fn all_keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.names.iter().chain(&self.symbols).chain(&self.aliases)
    }

    /// Get the symbol that represent this unit. The process is:
    /// - First symbol (if any)
    /// - Or first name (if any)
    /// - Or first alias (if any)
    pub fn symbol(&self) -> &str {
        self.symbols
            .first()
            .or_else(|| self.names.first())
            .or_else(|| self.aliases.first())
            .map(AsRef::as_ref)
            .unwrap_or_default()
    }

    /// Ratio to the base unit in a region
    pub fn ratio_for(&self, system: System) -> f64 {
        self.ratios[system].unwrap_or(self.ratio)
    }

    /// Check if the unit is used in a regional system
    ///
    /// - Units without a system, like `piece`, are always compatible.
    /// - Metric units are used in [`System::Metric`] and [`System::Jp`].
    /// - Imperial units are used in [`System::Us`] and [`System::Uk`].
    /// - Ambiguous units in the non metric regions that define them.
    pub fn is_compatible_with(&self, system: System) -> bool {
        match self.system {
            None => true,
            Some(UnitSystem::Metric) => matches!(system, System::Metric | System::Jp),
            Some(UnitSystem::Imperial) => matches!(system, System::Us | System::Uk),
            Some(UnitSystem::Ambiguous) => {
                system != System::Metric && self.ratios[system].is_some()
            }
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() && !self.names.is_empty() {
            write!(f, "{}", self.names[0])
        } else {
            write!(f, "{}", self.symbol())
        }
    }
}

/// Natural display range `[min, max)` of a unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NaturalRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl NaturalRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value < max)
    }
}

impl Default for NaturalRange {
    fn default() -> Self {
        Self { min: 0.0, max: None }
    }
}

/// Fraction display configuration of a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FractionsConfig {
    pub denominators: Vec<u32>,
    pub accuracy: f32,
    pub max_whole: u32,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    enum_map::Enum,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PhysicalQuantity {
    Mass,
    Volume,
    Count,
}

/// Regional system a recipe is written for
///
/// Ambiguous units, like `cup`, have a different size in each one.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    Default,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    enum_map::Enum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum System {
    Metric,
    #[default]
    Us,
    Uk,
    Jp,
}

/// System a unit belongs to
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    Hash,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum UnitSystem {
    Metric,
    Imperial,
    /// The size depends on the region
    Ambiguous,
}

/// Error when try to convert an unknown unit
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Unknown unit: '{0}'")]
pub struct UnknownUnit(pub String);

/// Value to convert
#[derive(PartialEq, Clone, Debug)]
pub enum ConvertValue {
    Number(f64),
    /// It will convert the range as if start and end were 2 calls to convert as
    /// a number
    Range(RangeInclusive<f64>),
}

impl ConvertValue {
    /// Value used to choose a unit
    pub fn first(&self) -> f64 {
        match self {
            ConvertValue::Number(n) => *n,
            ConvertValue::Range(r) => *r.start(),
        }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        match self {
            ConvertValue::Number(n) => ConvertValue::Number(f(*n)),
            ConvertValue::Range(r) => ConvertValue::Range(f(*r.start())..=f(*r.end())),
        }
    }

    /// Adds two values. A number added to a range is added to both ends.
    pub fn add(&self, rhs: &Self) -> Self {
        match (self, rhs) {
            (ConvertValue::Number(a), ConvertValue::Number(b)) => {
                ConvertValue::Number(decimal_add(*a, *b))
            }
            (ConvertValue::Number(n), ConvertValue::Range(r))
            | (ConvertValue::Range(r), ConvertValue::Number(n)) => {
                ConvertValue::Range(decimal_add(*r.start(), *n)..=decimal_add(*r.end(), *n))
            }
            (ConvertValue::Range(a), ConvertValue::Range(b)) => ConvertValue::Range(
                decimal_add(*a.start(), *b.start())..=decimal_add(*a.end(), *b.end()),
            ),
        }
    }
}

impl TryFrom<&Value> for ConvertValue {
    type Error = TextValueError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let value = match value {
            Value::Number(n) => ConvertValue::Number(n.value()),
            Value::Range { start, end } => ConvertValue::Range(start.value()..=end.value()),
            Value::Text(_) => return Err(TextValueError(value.clone())),
        };
        Ok(value)
    }
}

impl From<f64> for ConvertValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<RangeInclusive<f64>> for ConvertValue {
    fn from(value: RangeInclusive<f64>) -> Self {
        Self::Range(value)
    }
}

/// Errors from converting
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("Tried to convert a value with no unit")]
    NoUnit,

    #[error(transparent)]
    TextValue(#[from] TextValueError),

    #[error("Mixed physical quantities: {from} {to}")]
    MixedQuantities {
        from: PhysicalQuantity,
        to: PhysicalQuantity,
    },

    #[error("Could not find best unit for a {physical_quantity} unit. System: {system}")]
    BestUnitNotFound {
        physical_quantity: PhysicalQuantity,
        system: System,
    },

    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),

    #[error(transparent)]
    Quantity(#[from] QuantityAddError),
}

#[cfg(all(test, feature = "bundled_units"))]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("g" => "g")]
    #[test_case("Grams" => "g")]
    #[test_case("KG" => "kg")]
    #[test_case("tablespoons" => "tbsp")]
    #[test_case(" cups " => "c")]
    #[test_case("fl oz" => "fl oz")]
    fn find_unit(name: &str) -> String {
        Converter::bundled().find_unit(name).unwrap().symbol().to_string()
    }

    #[test]
    fn unknown_unit() {
        assert!(Converter::bundled().find_unit("bag").is_none());
        assert!(Converter::empty().find_unit("g").is_none());
    }

    #[test]
    fn ambiguous_ratios() {
        let converter = Converter::bundled();
        let cup = converter.find_unit("cup").unwrap();
        assert_eq!(cup.system, Some(UnitSystem::Ambiguous));
        assert_eq!(cup.ratio_for(System::Metric), 250.0);
        assert_eq!(cup.ratio_for(System::Uk), 284.130625);
        assert_eq!(cup.ratio, cup.ratio_for(System::Us));

        let pint = converter.find_unit("pint").unwrap();
        // no metric pint, the default region is used
        assert_eq!(pint.ratio_for(System::Metric), pint.ratio_for(System::Us));
    }

    #[test_case("g", System::Metric => true)]
    #[test_case("g", System::Jp => true)]
    #[test_case("g", System::Us => false)]
    #[test_case("oz", System::Uk => true)]
    #[test_case("oz", System::Metric => false)]
    #[test_case("cup", System::Us => true)]
    #[test_case("cup", System::Jp => true)]
    #[test_case("cup", System::Metric => false)]
    #[test_case("pint", System::Jp => false)]
    #[test_case("piece", System::Us => true)]
    fn compatible_with_system(unit: &str, system: System) -> bool {
        Converter::bundled()
            .find_unit(unit)
            .unwrap()
            .is_compatible_with(system)
    }

    #[test]
    fn compatible_texts() {
        let converter = Converter::bundled();
        assert!(converter.compatible("g", "kg"));
        assert!(converter.compatible("bag", "bag"));
        assert!(!converter.compatible("g", "ml"));
        assert!(!converter.compatible("g", "bag"));
    }

    #[test]
    fn effective_system() {
        let converter = Converter::bundled();
        let unit = |u: &str| converter.find_unit(u).unwrap();
        assert_eq!(
            converter.effective_system(&unit("g"), &unit("kg")),
            System::Metric
        );
        assert_eq!(
            converter.effective_system(&unit("lb"), &unit("oz")),
            System::Us
        );
        assert_eq!(
            converter.effective_system(&unit("ml"), &unit("cup")),
            System::Metric
        );
        assert_eq!(
            converter.effective_system(&unit("piece"), &unit("dozen")),
            System::Us
        );
    }

    #[test]
    fn best_units_are_sorted() {
        let converter = Converter::bundled();
        let best: Vec<_> = converter
            .best_units(PhysicalQuantity::Volume, System::Us)
            .map(|u| u.symbol().to_string())
            .collect();
        assert_eq!(best, ["tsp", "tbsp", "fl oz", "c", "pt", "qt", "gal"]);
        let best: Vec<_> = converter
            .best_units(PhysicalQuantity::Volume, System::Jp)
            .map(|u| u.symbol().to_string())
            .collect();
        assert_eq!(best, ["ml", "tsp", "tbsp", "c", "l"]);
    }

    #[test]
    fn convert_values() {
        let converter = Converter::bundled();
        let kg = converter.find_unit("kg").unwrap();
        let g = converter.find_unit("g").unwrap();
        let ml = converter.find_unit("ml").unwrap();
        assert_eq!(converter.convert_f64(1.5, &kg, &g, System::Metric), Ok(1500.0));
        assert!(matches!(
            converter.convert_f64(1.0, &kg, &ml, System::Metric),
            Err(ConvertError::MixedQuantities { .. })
        ));
    }

    #[test]
    fn system_from_str() {
        assert_eq!("US".parse::<System>().unwrap(), System::Us);
        assert_eq!("metric".parse::<System>().unwrap(), System::Metric);
        assert_eq!(System::Jp.to_string(), "jp");
    }
}
