use std::sync::Arc;

use enum_map::EnumMap;
use thiserror::Error;

use super::{
    units_file::{BestUnits, Extend, Precedence, UnitEntry, Units, UnitsFile},
    BestConversions, Converter, FractionsConfig, NaturalRange, PhysicalQuantity, System, Unit,
    UnitIndex, UnitSystem, UnknownUnit,
};
use crate::quantity::{DEFAULT_ACCURACY, DEFAULT_MAX_WHOLE};

/// Builder to create a custom [`Converter`]
///
/// The builder uses [`UnitsFile`] to configure the converter. More than one
/// file can be layered. Order matters, as one file can extend the units of
/// another added before, or be overwritten by others after.
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    all_units: Vec<Unit>,
    unit_index: UnitIndex,
    extend: Vec<Extend>,
    best_units: EnumMap<PhysicalQuantity, Option<BestUnits>>,
    default_system: Option<System>,
}

impl ConverterBuilder {
    /// New empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the bundled units to the builder
    ///
    /// This is only available with the `bundled_units` feature.
    #[cfg(feature = "bundled_units")]
    pub fn with_bundled_units(mut self) -> Result<Self, ConverterBuilderError> {
        self.add_units_file(UnitsFile::bundled())?;
        Ok(self)
    }

    /// Add a [`UnitsFile`] to the builder
    pub fn with_units_file(mut self, units: UnitsFile) -> Result<Self, ConverterBuilderError> {
        self.add_units_file(units)?;
        Ok(self)
    }

    /// Add a [`UnitsFile`] to the builder
    pub fn add_units_file(&mut self, units: UnitsFile) -> Result<&mut Self, ConverterBuilderError> {
        // the default system of this layer applies to its own ambiguous units
        if let Some(default_system) = units.default_system {
            self.default_system = Some(default_system);
        }
        let default_system = self.default_system.unwrap_or_default();

        for group in units.quantity {
            let mut add_units = |units: Vec<UnitEntry>,
                                 system: Option<UnitSystem>|
             -> Result<(), ConverterBuilderError> {
                for entry in units {
                    let unit = unit_from_entry(entry, group.quantity, system, default_system)?;
                    self.add_unit(unit)?;
                }
                Ok(())
            };
            match group.units {
                Some(Units::Unified(units)) => add_units(units, None)?,
                Some(Units::BySystem {
                    metric,
                    imperial,
                    ambiguous,
                }) => {
                    add_units(metric, Some(UnitSystem::Metric))?;
                    add_units(imperial, Some(UnitSystem::Imperial))?;
                    add_units(ambiguous, Some(UnitSystem::Ambiguous))?;
                }
                None => {}
            }

            // store best units. this will always override
            if let Some(best_units) = group.best {
                if match &best_units {
                    BestUnits::Unified(v) => v.is_empty(),
                    BestUnits::BySystem { metric, us, uk, jp } => {
                        metric.is_empty() || us.is_empty() || uk.is_empty() || jp.is_empty()
                    }
                } {
                    return Err(ConverterBuilderError::EmptyBest {
                        reason: "empty list of units",
                        quantity: group.quantity,
                    });
                }
                self.best_units[group.quantity] = Some(best_units);
            }
        }

        // Store the extensions to apply them at the end
        if let Some(extend) = units.extend {
            self.extend.push(extend);
        }

        Ok(self)
    }

    /// Consume the builder and return the new [`Converter`]
    pub fn finish(mut self) -> Result<Converter, ConverterBuilderError> {
        apply_extend_groups(self.extend, &mut self.all_units, &mut self.unit_index)?;

        let mut best = EnumMap::<PhysicalQuantity, EnumMap<System, BestConversions>>::default();
        for (q, by_system) in best.iter_mut() {
            let Some(best_units) = &self.best_units[q] else {
                return Err(ConverterBuilderError::EmptyBest {
                    reason: "no best units given",
                    quantity: q,
                });
            };
            for (system, conversions) in by_system.iter_mut() {
                let names = match best_units {
                    BestUnits::Unified(names) => names,
                    BestUnits::BySystem { metric, us, uk, jp } => match system {
                        System::Metric => metric,
                        System::Us => us,
                        System::Uk => uk,
                        System::Jp => jp,
                    },
                };
                *conversions =
                    BestConversions::new(names, system, q, &self.unit_index, &self.all_units)?;
            }
        }

        Ok(Converter {
            all_units: self.all_units.into_iter().map(Arc::new).collect(),
            unit_index: self.unit_index,
            best,
            default_system: self.default_system.unwrap_or_default(),
        })
    }

    fn add_unit(&mut self, unit: Unit) -> Result<usize, ConverterBuilderError> {
        let id = self.all_units.len();
        self.unit_index.add_unit(&unit, id)?;
        self.all_units.push(unit);
        Ok(id)
    }
}

fn unit_from_entry(
    entry: UnitEntry,
    quantity: PhysicalQuantity,
    system: Option<UnitSystem>,
    default_system: System,
) -> Result<Unit, ConverterBuilderError> {
    let mut ratios = EnumMap::<System, Option<f64>>::default();
    for (s, r) in &entry.ratios {
        ratios[*s] = Some(*r);
    }
    if system != Some(UnitSystem::Ambiguous) && !entry.ratios.is_empty() {
        return Err(ConverterBuilderError::RegionalRatios {
            name: first_key(&entry.names, &entry.symbols),
        });
    }
    let Some(ratio) = entry.ratio.or(ratios[default_system]) else {
        return Err(ConverterBuilderError::MissingRatio {
            name: first_key(&entry.names, &entry.symbols),
            system: default_system,
        });
    };
    let range = entry
        .range
        .map(|r| NaturalRange {
            min: r.min,
            max: r.max,
        })
        .unwrap_or_default();
    let fractions = entry.fractions.map(|f| FractionsConfig {
        denominators: f.denominators,
        accuracy: f.accuracy.unwrap_or(DEFAULT_ACCURACY).clamp(0.0, 1.0),
        max_whole: f.max_whole.unwrap_or(DEFAULT_MAX_WHOLE),
    });

    Ok(Unit {
        names: entry.names,
        symbols: entry.symbols,
        aliases: entry.aliases,
        ratio,
        ratios,
        physical_quantity: quantity,
        system,
        range,
        fractions,
        integer: entry.integer,
    })
}

fn first_key(names: &[Arc<str>], symbols: &[Arc<str>]) -> String {
    names
        .first()
        .or(symbols.first())
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string())
}

impl BestConversions {
    fn new(
        units: &[String],
        system: System,
        quantity: PhysicalQuantity,
        unit_index: &UnitIndex,
        all_units: &[Unit],
    ) -> Result<Self, ConverterBuilderError> {
        let mut units = units
            .iter()
            .map(|n| unit_index.get_unit_id(n))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(&id) = units
            .iter()
            .find(|&&id| all_units[id].physical_quantity != quantity)
        {
            return Err(ConverterBuilderError::BestUnitQuantity {
                name: all_units[id].symbol().to_string(),
                quantity,
            });
        }

        units.sort_by(|a, b| {
            let a = all_units[*a].ratio_for(system);
            let b = all_units[*b].ratio_for(system);
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Less)
        });
        units.dedup();

        Ok(Self(units))
    }
}

fn apply_extend_groups(
    extend: Vec<Extend>,
    all_units: &mut [Unit],
    unit_index: &mut UnitIndex,
) -> Result<(), ConverterBuilderError> {
    for extend_group in extend {
        let Extend { precedence, units } = extend_group;

        let mut to_update = Vec::with_capacity(units.len());

        // First resolve keys with current config
        for (k, entry) in units {
            let id = unit_index.get_unit_id(k.as_str())?;
            if to_update.iter().any(|&(eid, _)| eid == id) {
                return Err(ConverterBuilderError::DuplicateExtendUnit { key: k });
            }
            to_update.push((id, entry));
        }

        // Then apply updates
        for (id, entry) in to_update {
            unit_index.remove_unit(&all_units[id]);
            let unit = &mut all_units[id];

            if let Some(ratio) = entry.ratio {
                unit.ratio = ratio;
            }
            if let Some(range) = entry.range {
                unit.range = NaturalRange {
                    min: range.min,
                    max: range.max,
                };
            }
            if let Some(names) = entry.names {
                join_alias_vec(&mut unit.names, names, precedence);
            }
            if let Some(symbols) = entry.symbols {
                join_alias_vec(&mut unit.symbols, symbols, precedence);
            }
            if let Some(aliases) = entry.aliases {
                join_alias_vec(&mut unit.aliases, aliases, precedence);
            }

            unit_index.add_unit(&all_units[id], id)?;
        }
    }
    Ok(())
}

fn join_alias_vec(target: &mut Vec<Arc<str>>, mut src: Vec<Arc<str>>, src_precedence: Precedence) {
    match src_precedence {
        Precedence::Before => {
            src.append(target);
            *target = src;
        }
        Precedence::After => {
            target.append(&mut src);
        }
        Precedence::Override => {
            *target = src;
        }
    }
}

impl UnitIndex {
    fn remove_unit(&mut self, unit: &Unit) {
        for key in unit.all_keys() {
            self.0.remove(key.to_lowercase().as_str());
        }
    }

    fn add_unit(&mut self, unit: &Unit, id: usize) -> Result<usize, ConverterBuilderError> {
        let mut added = 0;
        for key in unit.all_keys() {
            if key.trim().is_empty() {
                return Err(ConverterBuilderError::EmptyUnitKey {
                    unit: unit.clone().into(),
                });
            }
            let lower: Arc<str> = key.trim().to_lowercase().into();
            match self.0.insert(Arc::clone(&lower), id) {
                // the same unit can repeat a key with a different case
                Some(other) if other != id => {
                    return Err(ConverterBuilderError::DuplicateUnit {
                        name: key.to_string(),
                    });
                }
                _ => added += 1,
            }
        }
        if added == 0 {
            return Err(ConverterBuilderError::EmptyUnit {
                unit: unit.clone().into(),
            });
        }
        Ok(added)
    }
}

/// Errors generated by [`ConverterBuilder`]
#[derive(Debug, Error)]
pub enum ConverterBuilderError {
    #[error("Duplicate unit: {name}")]
    DuplicateUnit { name: String },

    #[error("Duplicate unit in extend, another key points to the same unit: {key}")]
    DuplicateExtendUnit { key: String },

    #[error(transparent)]
    UnknownUnit(#[from] UnknownUnit),

    #[error("Unit without names or symbols in {}", unit.physical_quantity)]
    EmptyUnit { unit: Box<Unit> },

    #[error("Unit where a name, symbol or alias is empty in {}: {}", unit.physical_quantity, first_key(&unit.names, &unit.symbols))]
    EmptyUnitKey { unit: Box<Unit> },

    #[error("Unit '{name}' has no ratio for the default system '{system}'")]
    MissingRatio { name: String, system: System },

    #[error("Only ambiguous units can have regional ratios: '{name}'")]
    RegionalRatios { name: String },

    #[error("Best units for '{quantity}' empty: {reason}")]
    EmptyBest {
        reason: &'static str,
        quantity: PhysicalQuantity,
    },

    #[error("Best unit '{name}' is not a '{quantity}' unit")]
    BestUnitQuantity {
        name: String,
        quantity: PhysicalQuantity,
    },
}
