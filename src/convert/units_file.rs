//! Configuration data structures used in [`ConverterBuilder`](super::ConverterBuilder)

use serde::Deserialize;
use std::{collections::HashMap, fmt::Debug, sync::Arc};

use super::{PhysicalQuantity, System};

/// Configuration struct for units used in [`ConverterBuilder`](super::ConverterBuilder)
///
/// This structure is designed for deserializing [TOML](https://toml.io/en/),
/// but you can try other formats supported by serde.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitsFile {
    /// Region used to resolve ambiguous units when no system is given
    ///
    /// Defaults to [`System::Us`].
    pub default_system: Option<System>,
    /// Extend and/or edit units from other layers before
    pub extend: Option<Extend>,
    /// Declare new units
    #[serde(default)]
    pub quantity: Vec<QuantityGroup>,
}

/// Extend units from other layers config used in [`UnitsFile`]
///
/// The maps's keys are any name, symbol or alias of the unit you want to extend.
#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Extend {
    /// Precedence when joining to other layers
    pub precedence: Precedence,
    /// Map for units to edit
    pub units: HashMap<String, ExtendUnitEntry>,
}

/// Precedence when joining a list to other layers
///
/// This is important in, for example, the case of symbols. The first symbol
/// is the one that will be used for formatting.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Precedence {
    /// The list will be added before the current ones (*higher priority*)
    #[default]
    Before,
    /// The list will be added after the current ones (*lower priority*)
    After,
    /// The list will replace the current ones
    Override,
}

/// Editable unit
///
/// See [`Unit`](super::Unit).
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtendUnitEntry {
    pub ratio: Option<f64>,
    #[serde(alias = "name")]
    pub names: Option<Vec<Arc<str>>>,
    #[serde(alias = "symbol")]
    pub symbols: Option<Vec<Arc<str>>>,
    #[serde(alias = "alias")]
    pub aliases: Option<Vec<Arc<str>>>,
    pub range: Option<RangeEntry>,
}

/// Configuration of a group of units belonging to a [physical quantity]
///
/// [physical quantity]: https://en.wikipedia.org/wiki/Physical_quantity
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct QuantityGroup {
    /// Quantity of the group
    ///
    /// All units in this struct will be belong to this quantity
    pub quantity: PhysicalQuantity,
    /// List of best units
    ///
    /// At least one [`QuantityGroup`] of the quantity in any [`UnitsFile`] in
    /// a converter has to define it.
    ///
    /// **This will always replace the configuration from [`UnitsFile`] before**
    #[serde(default)]
    pub best: Option<BestUnits>,
    /// Definition of units
    #[serde(default)]
    pub units: Option<Units>,
}

/// List of best units
///
/// The *best* units are the candidates when a value is converted to a
/// [`System`] or when the sum of two quantities needs a display unit. The
/// order does not matter, they are sorted by size.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum BestUnits {
    /// Same list for every system
    Unified(Vec<String>),
    /// A list per regional system
    BySystem {
        metric: Vec<String>,
        us: Vec<String>,
        uk: Vec<String>,
        jp: Vec<String>,
    },
}

/// New units
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum Units {
    /// Units that do not belong to any system, like `piece`
    Unified(Vec<UnitEntry>),
    /// A list per unit system
    BySystem {
        #[serde(default)]
        metric: Vec<UnitEntry>,
        #[serde(default)]
        imperial: Vec<UnitEntry>,
        /// Units whose size depends on the region, like `cup`
        #[serde(default)]
        ambiguous: Vec<UnitEntry>,
    },
}

/// A new unit
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UnitEntry {
    /// Names. For example: `grams`
    #[serde(alias = "name")]
    pub names: Vec<Arc<str>>,
    /// Symbols. For example: `g`
    #[serde(default, alias = "symbol")]
    pub symbols: Vec<Arc<str>>,
    /// Whatever other way you want to call the unit.
    #[serde(default, alias = "alias")]
    pub aliases: Vec<Arc<str>>,
    /// Conversion ratio to the base unit of the quantity.
    ///
    /// For example, if `gram` has a ratio of `1`, `kilogram` will have a
    /// ratio of `1000`.
    ///
    /// Ambiguous units can omit it when [`Self::ratios`] has an entry for the
    /// default system.
    #[serde(default)]
    pub ratio: Option<f64>,
    /// Ratio per regional system. Only for ambiguous units.
    #[serde(default)]
    pub ratios: HashMap<System, f64>,
    /// Values in which the unit looks natural
    #[serde(default)]
    pub range: Option<RangeEntry>,
    /// Display values of this unit as fractions
    #[serde(default)]
    pub fractions: Option<FractionsEntry>,
    /// Values of this unit are always whole numbers
    #[serde(default)]
    pub integer: bool,
}

/// Natural display range `[min, max)`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RangeEntry {
    #[serde(default)]
    pub min: f64,
    pub max: Option<f64>,
}

/// Fraction display configuration of a unit
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FractionsEntry {
    /// Allowed denominators
    pub denominators: Vec<u32>,
    /// Max percent of error allowed (0 to 1). Defaults to `0.05` (5%).
    #[serde(default)]
    pub accuracy: Option<f32>,
    /// Max whole part allowed. Defaults to `4`.
    #[serde(default)]
    pub max_whole: Option<u32>,
}

#[cfg(feature = "bundled_units")]
const BUNDLED_UNITS: &str = include_str!("../../units.toml");

#[cfg(feature = "bundled_units")]
impl UnitsFile {
    /// Get the bundled units file
    ///
    /// This is only available with the `bundled_units` feature.
    pub fn bundled() -> Self {
        toml::from_str(BUNDLED_UNITS).expect("bundled units file is valid")
    }
}
