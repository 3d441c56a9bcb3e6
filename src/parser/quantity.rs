//! Quantity blocks, the text inside `{` `}`

use crate::quantity::{simplify_fraction, Number, Quantity, QuantityExpr, TotalQuantity, Value};

use super::ParserError;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuantity {
    pub quantity: Quantity,
    pub scalable: bool,
}

/// Parses the content of a quantity block
///
/// - A leading `=` marks the quantity as not scalable.
/// - Options separated by `|` are the same amount in different units, the
///   first is the primary.
/// - Each option is `value%unit`, `value unit` when the value is numeric, or
///   just `value`.
///
/// Returns [`None`] for an empty block.
pub fn parse_quantity(raw: &str, line: usize) -> Result<Option<ParsedQuantity>, ParserError> {
    let raw = raw.trim();
    let (scalable, raw) = match raw.strip_prefix('=') {
        Some(rest) => (false, rest.trim_start()),
        None => (true, raw),
    };

    let options = raw
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| single_quantity(s, line).map(QuantityExpr::Single))
        .collect::<Result<Vec<_>, _>>()?;

    let quantity = match QuantityExpr::Or(options).normalize() {
        TotalQuantity::Single(q) => q,
        _ => return Ok(None),
    };
    Ok(Some(ParsedQuantity { quantity, scalable }))
}

/// Splits a single `value%unit` or `value unit`
pub fn split_value_unit(s: &str, line: usize) -> Result<(Value, Option<String>), ParserError> {
    if let Some((value, unit)) = s.split_once('%') {
        let unit = unit.trim();
        return Ok((
            parse_value(value, line)?,
            (!unit.is_empty()).then(|| unit.to_string()),
        ));
    }

    if let Some(value) = numeric_value(s, line)? {
        return Ok((value, None));
    }

    // longest numeric prefix at a whitespace boundary
    let boundaries = s
        .char_indices()
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    for &pos in boundaries.iter().rev() {
        let (value, unit) = s.split_at(pos);
        let unit = unit.trim();
        if unit.is_empty() {
            continue;
        }
        if let Some(value) = numeric_value(value, line)? {
            return Ok((value, Some(unit.to_string())));
        }
    }

    Ok((parse_value(s, line)?, None))
}

fn single_quantity(s: &str, line: usize) -> Result<Quantity, ParserError> {
    let (value, unit) = split_value_unit(s, line)?;
    Ok(Quantity::new(value, unit))
}

/// Numeric value or, if it's not numeric, text
pub fn parse_value(s: &str, line: usize) -> Result<Value, ParserError> {
    let s = s.trim();
    Ok(numeric_value(s, line)?.unwrap_or_else(|| Value::Text(s.to_string())))
}

fn numeric_value(s: &str, line: usize) -> Result<Option<Value>, ParserError> {
    let s = s.trim();
    if let Some((start, end)) = s.split_once('-') {
        let (Some(start), Some(end)) = (number(start, line)?, number(end, line)?) else {
            return Ok(None);
        };
        return Ok(Some(Value::Range { start, end }));
    }
    Ok(number(s, line)?.map(Value::Number))
}

fn number(s: &str, line: usize) -> Result<Option<Number>, ParserError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }

    if let Some(n) = decimal(s) {
        return Ok(Some(Number::Decimal(n)));
    }

    if let Some(last) = s.chars().last() {
        if let Some((num, den)) = vulgar_fraction(last) {
            let whole = s[..s.len() - last.len_utf8()].trim();
            let whole = match whole {
                "" => 0,
                w => match integer(w) {
                    Some(w) => w,
                    None => return Ok(None),
                },
            };
            let Some(num) = mixed(whole, num, den) else {
                return Ok(None);
            };
            return fraction(num, den, line).map(Some);
        }
    }

    if let Some((a, b)) = s.split_once('/') {
        let b = b.trim();
        let (whole, a) = match a.trim().split_once(char::is_whitespace) {
            Some((whole, a)) => (integer(whole), a.trim()),
            None => (Some(0), a.trim()),
        };
        let (Some(whole), Some(a), Some(b)) = (whole, integer(a), integer(b)) else {
            return Ok(None);
        };
        let Some(num) = mixed(whole, a, b) else {
            return Ok(None);
        };
        return fraction(num, b, line).map(Some);
    }

    Ok(None)
}

/// Numerator of `whole num/den`, [`None`] on overflow
fn mixed(whole: i64, num: i64, den: i64) -> Option<i64> {
    whole.checked_mul(den)?.checked_add(num)
}

fn fraction(num: i64, den: i64, line: usize) -> Result<Number, ParserError> {
    simplify_fraction(num, den).ok_or(ParserError::DivisionByZero { line })
}

fn decimal(s: &str) -> Option<f64> {
    let mut dots = 0;
    let valid = s.chars().all(|c| match c {
        '0'..='9' => true,
        '.' => {
            dots += 1;
            dots == 1
        }
        _ => false,
    });
    (valid && s != ".").then(|| s.parse().ok()).flatten()
}

fn integer(s: &str) -> Option<i64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn vulgar_fraction(c: char) -> Option<(i64, i64)> {
    let f = match c {
        '½' => (1, 2),
        '⅓' => (1, 3),
        '⅔' => (2, 3),
        '¼' => (1, 4),
        '¾' => (3, 4),
        '⅕' => (1, 5),
        '⅖' => (2, 5),
        '⅗' => (3, 5),
        '⅘' => (4, 5),
        '⅙' => (1, 6),
        '⅚' => (5, 6),
        '⅐' => (1, 7),
        '⅛' => (1, 8),
        '⅜' => (3, 8),
        '⅝' => (5, 8),
        '⅞' => (7, 8),
        '⅑' => (1, 9),
        '⅒' => (1, 10),
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn q(value: Value, unit: Option<&str>) -> Quantity {
        Quantity::new(value, unit.map(String::from))
    }

    #[test_case("3" => Value::from(3.0); "integer")]
    #[test_case("1.5" => Value::from(1.5); "decimal")]
    #[test_case(".5" => Value::from(0.5); "leading dot")]
    #[test_case("1/2" => Value::Number(Number::Fraction { num: 1, den: 2 }); "fraction")]
    #[test_case("4/2" => Value::from(2.0); "whole fraction")]
    #[test_case("1 1/2" => Value::Number(Number::Fraction { num: 3, den: 2 }); "mixed")]
    #[test_case("½" => Value::Number(Number::Fraction { num: 1, den: 2 }); "vulgar")]
    #[test_case("1½" => Value::Number(Number::Fraction { num: 3, den: 2 }); "mixed vulgar")]
    #[test_case("2-3" => Value::Range { start: 2.0.into(), end: 3.0.into() }; "range")]
    #[test_case("1/2 - 1" => Value::Range { start: Number::Fraction { num: 1, den: 2 }, end: 1.0.into() }; "fraction range")]
    #[test_case("a pinch" => Value::Text("a pinch".into()); "text")]
    #[test_case("1.2.3" => Value::Text("1.2.3".into()); "two dots")]
    fn values(s: &str) -> Value {
        parse_value(s, 1).unwrap()
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            parse_value("1/0", 7),
            Err(ParserError::DivisionByZero { line: 7 })
        );
    }

    #[test_case("200%g" => q(200.0.into(), Some("g")); "percent")]
    #[test_case("200 g" => q(200.0.into(), Some("g")); "space")]
    #[test_case("1 1/2 cups" => q(Value::Number(Number::Fraction { num: 3, den: 2 }), Some("cups")); "mixed with unit")]
    #[test_case("2 large cans" => q(2.0.into(), Some("large cans")); "multi word unit")]
    #[test_case("to taste" => q(Value::Text("to taste".into()), None); "text only")]
    #[test_case("a few % leaves" => q(Value::Text("a few".into()), Some("leaves")); "text with unit")]
    #[test_case("1 1/2" => q(Value::Number(Number::Fraction { num: 3, den: 2 }), None); "mixed without unit")]
    #[test_case("1 ½" => q(Value::Number(Number::Fraction { num: 3, den: 2 }), None); "mixed vulgar without unit")]
    #[test_case("1 - 2" => q(Value::Range { start: 1.0.into(), end: 2.0.into() }, None); "spaced range")]
    fn quantities(s: &str) -> Quantity {
        parse_quantity(s, 1).unwrap().unwrap().quantity
    }

    #[test_case("9223372036854775807½"; "vulgar")]
    #[test_case("9223372036854775807 1/2"; "mixed")]
    fn overflow_is_text(s: &str) {
        assert_eq!(parse_value(s, 1), Ok(Value::Text(s.into())));
    }

    #[test]
    fn empty() {
        assert!(parse_quantity("", 1).unwrap().is_none());
        assert!(parse_quantity("  ", 1).unwrap().is_none());
        assert!(parse_quantity("=", 1).unwrap().is_none());
    }

    #[test]
    fn fixed() {
        let parsed = parse_quantity("=1%tsp", 1).unwrap().unwrap();
        assert!(!parsed.scalable);
        assert_eq!(parsed.quantity, q(1.0.into(), Some("tsp")));
    }

    #[test]
    fn equivalents() {
        let parsed = parse_quantity("1%cup|240%ml|8 oz", 1).unwrap().unwrap();
        assert!(parsed.scalable);
        assert_eq!(
            parsed.quantity,
            q(1.0.into(), Some("cup")).with_equivalents(vec![
                q(240.0.into(), Some("ml")),
                q(8.0.into(), Some("oz")),
            ])
        );
    }
}
