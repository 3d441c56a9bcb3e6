use cooklang_parser::{convert::System, parse, Converter, Number, Quantity, TotalQuantity, Value};
use test_case::test_case;

#[test_case(3.0, "tsp" => "1 tbsp")]
#[test_case(15.0, "tsp" => "2 1/2 fl oz")]
#[test_case(16.0, "tsp" => "2 3/4 fl oz")]
#[test_case(48.0, "tsp" => "1 c")]
fn us_best_unit(value: f64, unit: &str) -> String {
    let converter = Converter::default();
    let q = Quantity::new(Value::from(value), Some(unit.to_string()));
    converter
        .convert_to_system(&q, System::Us, None)
        .unwrap()
        .to_string()
}

#[test_case("@sugar{½%cup}" => Number::Fraction { num: 1, den: 2 }; "vulgar")]
#[test_case("@sugar{1½%cup}" => Number::Fraction { num: 3, den: 2 }; "mixed vulgar")]
#[test_case("@sugar{1 1/2%cup}" => Number::Fraction { num: 3, den: 2 }; "mixed")]
#[test_case("@sugar{6/8%cup}" => Number::Fraction { num: 3, den: 4 }; "reduced")]
#[test_case("@sugar{8/4%cup}" => Number::Decimal(2.0); "whole")]
#[test_case("@sugar{0.75%cup}" => Number::Decimal(0.75); "decimal")]
fn parsed_values(input: &str) -> Number {
    let recipe = parse(input).unwrap();
    match &recipe.ingredients[0].quantity_total {
        TotalQuantity::Single(Quantity {
            value: Value::Number(n),
            ..
        }) => *n,
        other => panic!("unexpected total: {other:?}"),
    }
}

#[test]
fn fractions_add_exactly() {
    let recipe = parse("@sugar{1/2%cup} and @&sugar{1/4%cup}").unwrap();
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "3/4 cup");
}

#[test]
fn scaled_fractions() {
    let converter = Converter::default();
    let recipe = parse("@sugar{3/4%cup}").unwrap();
    let double = recipe.scale_by(2.0, &converter).unwrap();
    assert_eq!(double.ingredients[0].quantity_total.to_string(), "1 1/2 cup");
    let half = recipe.scale_by(0.5, &converter).unwrap();
    assert_eq!(half.ingredients[0].quantity_total.to_string(), "3/8 cup");
}

#[test_case("@sugar{1 1/2}"; "mixed")]
#[test_case("@sugar{1 ½}"; "mixed vulgar")]
fn mixed_numbers_without_unit(input: &str) {
    let recipe = parse(input).unwrap();
    assert_eq!(
        recipe.ingredients[0].quantity_total,
        TotalQuantity::Single(Quantity::new(
            Value::Number(Number::Fraction { num: 3, den: 2 }),
            None
        ))
    );
}

#[test]
fn huge_mixed_number_is_text() {
    let recipe = parse("@x{9223372036854775807½}").unwrap();
    assert_eq!(
        recipe.ingredients[0].quantity_total.to_string(),
        "9223372036854775807½"
    );
}
