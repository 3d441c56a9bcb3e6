//! Quantity model and arithmetic

use std::fmt::Display;

use rust_decimal::{
    prelude::{FromPrimitive, ToPrimitive},
    Decimal, RoundingStrategy,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{Converter, PhysicalQuantity, System};

/// Significant digits kept when a value has to be rounded
pub const DEFAULT_PRECISION: u32 = 3;
/// Max relative error of a fraction approximation
pub const DEFAULT_ACCURACY: f32 = 0.05;
/// Max whole part of a fraction approximation
pub const DEFAULT_MAX_WHOLE: u32 = 4;

/// Distance to the closest integer under which the fractional part is ignored
const NEGLIGIBLE: f64 = 1e-3;

/// A numeric value
///
/// Fractions are always reduced, with a positive denominator greater than 1.
/// Operations that end with a whole fraction give a [`Number::Decimal`].
///
/// The [`Display`] implementation rounds decimals to 3 decimal places and
/// writes fractions as mixed numbers, like `1 1/2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Number {
    Decimal(f64),
    Fraction { num: i64, den: i64 },
}

impl Number {
    /// Get the numeric value
    pub fn value(&self) -> f64 {
        match *self {
            Number::Decimal(v) => v,
            Number::Fraction { num, den } => num as f64 / den as f64,
        }
    }

    pub fn is_fraction(&self) -> bool {
        matches!(self, Number::Fraction { .. })
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Decimal(v) => {
                // + 0.0 turns -0 into 0
                let v = (v * 1000.0).round() / 1000.0 + 0.0;
                write!(f, "{v}")
            }
            Number::Fraction { num, den } => {
                let whole = num / den;
                let rem = (num % den).abs();
                if whole == 0 {
                    write!(f, "{num}/{den}")
                } else if rem == 0 {
                    write!(f, "{whole}")
                } else {
                    write!(f, "{whole} {rem}/{den}")
                }
            }
        }
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Reduce a fraction. `den` must not be 0.
fn reduce(num: i64, den: i64) -> Number {
    debug_assert!(den != 0);
    let g = gcd(num, den).max(1);
    let (mut num, mut den) = (num / g, den / g);
    if den < 0 {
        num = -num;
        den = -den;
    }
    if den == 1 {
        Number::Decimal(num as f64)
    } else {
        Number::Fraction { num, den }
    }
}

/// Reduces `num/den`
///
/// The result has a positive denominator and collapses to a
/// [`Number::Decimal`] when the denominator reduces to 1. Returns [`None`]
/// when `den` is 0.
///
/// ```
/// # use cooklang_parser::quantity::*;
/// assert_eq!(simplify_fraction(6, 8), Some(Number::Fraction { num: 3, den: 4 }));
/// assert_eq!(simplify_fraction(10, 2), Some(Number::Decimal(5.0)));
/// assert_eq!(simplify_fraction(1, 0), None);
/// ```
pub fn simplify_fraction(num: i64, den: i64) -> Option<Number> {
    if den == 0 {
        return None;
    }
    Some(reduce(num, den))
}

fn decimal_op(a: f64, b: f64, op: fn(Decimal, Decimal) -> Option<Decimal>) -> Option<f64> {
    let a = Decimal::from_f64(a)?;
    let b = Decimal::from_f64(b)?;
    op(a, b)?.to_f64()
}

pub(crate) fn decimal_add(a: f64, b: f64) -> f64 {
    decimal_op(a, b, Decimal::checked_add).unwrap_or(a + b)
}

pub(crate) fn decimal_mul(a: f64, b: f64) -> f64 {
    decimal_op(a, b, Decimal::checked_mul).unwrap_or(a * b)
}

fn is_whole(v: f64) -> bool {
    v.is_finite() && v != 0.0 && (v - v.round()).abs() < 1e-9
}

/// Adds two numbers
///
/// Two fractions, or a fraction and a zero, add exactly as a fraction.
/// Everything else is added as a decimal without binary floating point error.
pub fn add_numeric(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Fraction { num: n1, den: d1 }, Number::Fraction { num: n2, den: d2 }) => {
            let exact = n1
                .checked_mul(d2)
                .zip(n2.checked_mul(d1))
                .and_then(|(x, y)| x.checked_add(y))
                .zip(d1.checked_mul(d2));
            match exact {
                Some((num, den)) => reduce(num, den),
                None => Number::Decimal(decimal_add(a.value(), b.value())),
            }
        }
        (f @ Number::Fraction { .. }, Number::Decimal(z))
        | (Number::Decimal(z), f @ Number::Fraction { .. })
            if z == 0.0 =>
        {
            f
        }
        _ => Number::Decimal(decimal_add(a.value(), b.value())),
    }
}

/// Multiplies a number by a factor
///
/// A factor of 1 returns the same number. Fractions stay fractions when the
/// factor or its inverse is a whole number, otherwise the product is rounded
/// with [`to_rounded_decimal`].
pub fn multiply_numeric(value: Number, factor: f64) -> Number {
    if factor == 1.0 {
        return value;
    }
    if let Number::Fraction { num, den } = value {
        if is_whole(factor) {
            if let Some(num) = num.checked_mul(factor.round() as i64) {
                return reduce(num, den);
            }
        }
        let inverse = 1.0 / factor;
        if is_whole(inverse) {
            if let Some(den) = den.checked_mul(inverse.round() as i64) {
                return reduce(num, den);
            }
        }
    }
    Number::Decimal(to_rounded_decimal(
        decimal_mul(value.value(), factor),
        DEFAULT_PRECISION,
    ))
}

/// Rounds to `precision` significant digits
///
/// Values with an integer part of 1000 or more are rounded to a whole number.
///
/// ```
/// # use cooklang_parser::quantity::to_rounded_decimal;
/// assert_eq!(to_rounded_decimal(12.345, 3), 12.3);
/// assert_eq!(to_rounded_decimal(0.012345, 3), 0.0123);
/// assert_eq!(to_rounded_decimal(1234.5, 3), 1235.0);
/// ```
pub fn to_rounded_decimal(value: f64, precision: u32) -> f64 {
    let Some(d) = Decimal::from_f64(value) else {
        return value;
    };
    let rounded = if d.abs() >= Decimal::ONE_THOUSAND {
        d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    } else {
        d.round_sf_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
            .unwrap_or(d)
    };
    rounded.to_f64().unwrap_or(value)
}

/// Finds the fraction `n/d` closest to `value`
///
/// `d` is taken from `denominators`. Returns [`None`] when the whole part is
/// greater than `max_whole`, when the value is (almost) a whole number or when
/// the best fraction has a relative error over `accuracy`.
///
/// ```
/// # use cooklang_parser::quantity::*;
/// assert_eq!(
///     approximate_fraction(0.333, &[2, 3, 4], 0.05, 4),
///     Some(Number::Fraction { num: 1, den: 3 })
/// );
/// assert_eq!(approximate_fraction(2.0, &[2, 3, 4], 0.05, 4), None);
/// assert_eq!(approximate_fraction(10.5, &[2], 0.05, 4), None);
/// ```
pub fn approximate_fraction(
    value: f64,
    denominators: &[u32],
    accuracy: f32,
    max_whole: u32,
) -> Option<Number> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    if value.trunc() > max_whole as f64 || (value - value.round()).abs() < NEGLIGIBLE {
        return None;
    }

    let mut best: Option<(i64, i64, f64)> = None;
    for &den in denominators.iter().filter(|&&d| d > 1) {
        let den = den as i64;
        let num = (value * den as f64).round() as i64;
        if num == 0 || num % den == 0 {
            continue;
        }
        let err = (num as f64 / den as f64 - value).abs() / value;
        if best.map_or(true, |(_, _, e)| err < e) {
            best = Some((num, den, err));
        }
    }

    let (num, den, err) = best?;
    (err <= accuracy as f64).then(|| reduce(num, den))
}

/// Base value of a quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    /// Numeric
    Number(Number),
    /// Range
    Range { start: Number, end: Number },
    /// Text
    ///
    /// It is not possible to operate with this variant.
    Text(String),
}

impl Value {
    /// Check if the value is text
    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    /// Multiplies the value with [`multiply_numeric`]. Text is not changed.
    pub fn multiply(&self, factor: f64) -> Value {
        match self {
            Value::Number(n) => Value::Number(multiply_numeric(*n, factor)),
            Value::Range { start, end } => Value::Range {
                start: multiply_numeric(*start, factor),
                end: multiply_numeric(*end, factor),
            },
            Value::Text(t) => Value::Text(t.clone()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Range { start, end } => write!(f, "{start}-{end}"),
            Value::Text(t) => write!(f, "{t}"),
        }
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

pub trait TryAdd: Sized {
    type Err;

    fn try_add(&self, rhs: &Self) -> Result<Self, Self::Err>;
}

/// Error when try to operate on a text value
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Cannot add a text value: '{0}'")]
pub struct TextValueError(pub Value);

impl TryAdd for Value {
    type Err = TextValueError;

    /// A number added to a range is added to both ends
    fn try_add(&self, rhs: &Self) -> Result<Value, TextValueError> {
        let val = match (self, rhs) {
            (t @ Value::Text(_), _) | (_, t @ Value::Text(_)) => {
                return Err(TextValueError(t.to_owned()));
            }
            (Value::Number(a), Value::Number(b)) => Value::Number(add_numeric(*a, *b)),
            (Value::Number(n), Value::Range { start, end })
            | (Value::Range { start, end }, Value::Number(n)) => Value::Range {
                start: add_numeric(*start, *n),
                end: add_numeric(*end, *n),
            },
            (
                Value::Range {
                    start: s1,
                    end: e1,
                },
                Value::Range {
                    start: s2,
                    end: e2,
                },
            ) => Value::Range {
                start: add_numeric(*s1, *s2),
                end: add_numeric(*e1, *e2),
            },
        };

        Ok(val)
    }
}

/// A quantity used in components
///
/// `equivalents` are the same amount expressed in other units, written like
/// `{100%g|3.5%oz}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Value,
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equivalents: Vec<Quantity>,
}

/// Error during adding of quantities
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuantityAddError {
    #[error(transparent)]
    IncompatibleUnits(#[from] IncompatibleUnits),

    #[error(transparent)]
    TextValue(#[from] TextValueError),
}

/// Error that makes quantity units incompatible to be added
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IncompatibleUnits {
    #[error("Different physical quantity: '{a}' '{b}'")]
    DifferentPhysicalQuantities {
        a: PhysicalQuantity,
        b: PhysicalQuantity,
    },
    #[error("Unknown units differ: '{a}' '{b}'")]
    UnknownDifferentUnits { a: String, b: String },
}

impl Quantity {
    /// Creates a new quantity without equivalents
    ///
    /// An empty unit is the same as no unit.
    pub fn new(value: Value, unit: Option<String>) -> Self {
        Self {
            value,
            unit: unit.filter(|u| !u.trim().is_empty()),
            equivalents: Vec::new(),
        }
    }

    pub fn with_equivalents(mut self, equivalents: Vec<Quantity>) -> Self {
        self.equivalents = equivalents;
        self
    }

    /// Get the unit text
    pub fn unit_text(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Multiplies the value and all the equivalents
    pub fn scale(&mut self, factor: f64) {
        self.value = self.value.multiply(factor);
        for eq in &mut self.equivalents {
            eq.scale(factor);
        }
    }

    /// Try adding two quantities
    ///
    /// - A missing unit takes the unit of the other quantity.
    /// - Equal units are added directly.
    /// - Known units of the same [`PhysicalQuantity`] are converted and the
    ///   result is shown in the best unit, see [`Converter`].
    ///
    /// `context` is the [`System`] used for units that change between
    /// regions, like `cup`.
    ///
    /// Equivalents are added in pairs when possible. The ones that can't be
    /// paired are lost.
    #[tracing::instrument(level = "trace", skip_all, fields(lhs = %self, rhs = %rhs), ret)]
    pub fn try_add(
        &self,
        rhs: &Self,
        converter: &Converter,
        context: Option<System>,
    ) -> Result<Self, QuantityAddError> {
        let sum = self.add_primary(rhs, converter, context)?;
        let equivalents = add_equivalents(&self.equivalents, &rhs.equivalents, converter, context);
        Ok(sum.with_equivalents(equivalents))
    }

    fn add_primary(
        &self,
        rhs: &Self,
        converter: &Converter,
        context: Option<System>,
    ) -> Result<Self, QuantityAddError> {
        if let t @ Value::Text(_) = &self.value {
            return Err(TextValueError(t.clone()).into());
        }
        if let t @ Value::Text(_) = &rhs.value {
            return Err(TextValueError(t.clone()).into());
        }

        match (self.unit_text(), rhs.unit_text()) {
            (None, None) => Ok(Quantity::new(self.value.try_add(&rhs.value)?, None)),
            (Some(u), None) | (None, Some(u)) => Ok(Quantity::new(
                self.value.try_add(&rhs.value)?,
                Some(u.to_string()),
            )),
            (Some(a), Some(b)) if a == b => Ok(Quantity::new(
                self.value.try_add(&rhs.value)?,
                Some(a.to_string()),
            )),
            (Some(a), Some(b)) => match (converter.find_unit(a), converter.find_unit(b)) {
                (Some(a_unit), Some(b_unit)) => {
                    if a_unit.physical_quantity != b_unit.physical_quantity {
                        return Err(IncompatibleUnits::DifferentPhysicalQuantities {
                            a: a_unit.physical_quantity,
                            b: b_unit.physical_quantity,
                        }
                        .into());
                    }
                    let sum = converter.add_in_best_unit(
                        (&self.value, &a_unit, a),
                        (&rhs.value, &b_unit, b),
                        context,
                    )?;
                    Ok(sum)
                }
                _ => Err(IncompatibleUnits::UnknownDifferentUnits {
                    a: a.to_string(),
                    b: b.to_string(),
                }
                .into()),
            },
        }
    }
}

fn add_equivalents(
    lhs: &[Quantity],
    rhs: &[Quantity],
    converter: &Converter,
    context: Option<System>,
) -> Vec<Quantity> {
    let mut used = vec![false; rhs.len()];
    lhs.iter()
        .filter_map(|a| {
            for (i, b) in rhs.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if let Ok(sum) = a.try_add(b, converter, context) {
                    used[i] = true;
                    return Some(sum);
                }
            }
            None
        })
        .collect()
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)?;
        if let Some(unit) = &self.unit {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}

/// Quantity expression as written, before normalization
///
/// `{1%cup|240%ml}` is an [`QuantityExpr::Or`]: both are the same amount.
/// [`QuantityExpr::And`] are amounts that have to be kept separate because
/// they can't be added.
#[derive(Debug, Clone, PartialEq)]
pub enum QuantityExpr {
    Single(Quantity),
    And(Vec<QuantityExpr>),
    Or(Vec<QuantityExpr>),
}

impl QuantityExpr {
    /// Flattens the expression
    ///
    /// An OR group becomes one quantity, the first option is the primary and
    /// the rest are its equivalents. AND groups become separate quantities.
    pub fn normalize(self) -> TotalQuantity {
        TotalQuantity::from_vec(self.flatten())
    }

    fn flatten(self) -> Vec<Quantity> {
        match self {
            QuantityExpr::Single(q) => vec![q],
            QuantityExpr::And(parts) => parts.into_iter().flat_map(Self::flatten).collect(),
            QuantityExpr::Or(parts) => {
                let mut all = parts
                    .into_iter()
                    .flat_map(Self::flatten)
                    .flat_map(|q| {
                        let Quantity {
                            value,
                            unit,
                            equivalents,
                        } = q;
                        std::iter::once(Quantity::new(value, unit)).chain(equivalents)
                    });
                let Some(mut primary) = all.next() else {
                    return vec![];
                };
                primary.equivalents.extend(all);
                vec![primary]
            }
        }
    }
}

impl From<TotalQuantity> for QuantityExpr {
    fn from(value: TotalQuantity) -> Self {
        match value {
            TotalQuantity::None => QuantityExpr::And(vec![]),
            TotalQuantity::Single(q) => QuantityExpr::Single(q),
            TotalQuantity::Many(many) => {
                QuantityExpr::And(many.into_iter().map(QuantityExpr::Single).collect())
            }
        }
    }
}

/// Total quantity of an ingredient
///
/// [`TotalQuantity::Many`] is needed to avoid loosing information when not all
/// quantities are compatible. This happens when the total cannot be calculated
/// because 2 or more units can't be added. In this case, the vec contains all
/// the quantities added where possible.
///
/// For example:
/// ```
/// # use cooklang_parser::quantity::*;
/// # use cooklang_parser::convert::Converter;
/// # let converter = Converter::bundled();
/// let a = Quantity::new(Value::from(2.0), Some("l".into()));
/// let b = Quantity::new(Value::from(200.0), Some("ml".into()));
/// let c = Quantity::new(Value::from(1.0), Some("bottle".into()));
///
/// let mut total = TotalQuantity::None;
/// total.add(&a, &converter, None).unwrap();
/// total.add(&b, &converter, None).unwrap();
/// total.add(&c, &converter, None).unwrap();
/// assert_eq!(
///     total,
///     TotalQuantity::Many(vec![
///         Quantity::new(Value::from(2.2), Some("l".into())),
///         Quantity::new(Value::from(1.0), Some("bottle".into()))
///     ])
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TotalQuantity {
    /// No quantity
    #[default]
    None,
    /// A single quantity
    Single(Quantity),
    /// Many quantities when they can't be added
    Many(Vec<Quantity>),
}

impl TotalQuantity {
    fn from_vec(mut all: Vec<Quantity>) -> Self {
        match all.len() {
            0 => TotalQuantity::None,
            1 => TotalQuantity::Single(all.remove(0)),
            _ => TotalQuantity::Many(all),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TotalQuantity::None)
    }

    /// Get the quantities as a slice
    pub fn quantities(&self) -> &[Quantity] {
        match self {
            TotalQuantity::None => &[],
            TotalQuantity::Single(q) => std::slice::from_ref(q),
            TotalQuantity::Many(many) => many,
        }
    }

    /// Get the total quantity as a vec of quantities
    ///
    /// - [`TotalQuantity::None`] is an empty vec.
    /// - [`TotalQuantity::Single`] is a vec with one item.
    /// - [`TotalQuantity::Many`] is just it's inner vec.
    pub fn into_vec(self) -> Vec<Quantity> {
        match self {
            TotalQuantity::None => vec![],
            TotalQuantity::Single(q) => vec![q],
            TotalQuantity::Many(many) => many,
        }
    }

    /// Adds a quantity to the total
    ///
    /// The quantity is added to the first compatible one. If none is
    /// compatible, it is kept apart as an AND group. Text values are an error.
    pub fn add(
        &mut self,
        quantity: &Quantity,
        converter: &Converter,
        context: Option<System>,
    ) -> Result<(), QuantityAddError> {
        let parts = match self {
            TotalQuantity::None => {
                *self = TotalQuantity::Single(quantity.clone());
                return Ok(());
            }
            TotalQuantity::Single(q) => std::slice::from_mut(q),
            TotalQuantity::Many(many) => many.as_mut_slice(),
        };

        for part in parts.iter_mut() {
            match part.try_add(quantity, converter, context) {
                Ok(sum) => {
                    *part = sum;
                    return Ok(());
                }
                Err(QuantityAddError::IncompatibleUnits(e)) => {
                    tracing::trace!("not added to '{part}': {e}");
                }
                Err(e) => return Err(e),
            }
        }

        tracing::debug!("incompatible units for '{quantity}', keeping them apart");
        let old = std::mem::take(self);
        *self = QuantityExpr::And(vec![old.into(), QuantityExpr::Single(quantity.clone())])
            .normalize();
        Ok(())
    }
}

impl From<TotalQuantity> for Vec<Quantity> {
    fn from(value: TotalQuantity) -> Self {
        value.into_vec()
    }
}

impl Display for TotalQuantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for q in self.quantities() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{q}")?;
            first = false;
        }
        Ok(())
    }
}
