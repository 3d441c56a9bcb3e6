use cooklang_parser::{
    convert::{EquivalentsPolicy, System},
    quantity::{IncompatibleUnits, QuantityAddError},
    CooklangParser, Quantity, Recipe, TotalQuantity, Value,
};
use test_case::test_case;

fn convert(input: &str, system: System, policy: EquivalentsPolicy) -> Recipe {
    let parser = CooklangParser::default();
    let recipe = parser.parse(input).unwrap();
    recipe.convert_to(system, policy, parser.converter()).unwrap()
}

fn q(value: f64, unit: &str) -> Quantity {
    Quantity::new(Value::from(value), Some(unit.to_string()))
}

#[test_case(EquivalentsPolicy::Keep => q(473.0, "ml").with_equivalents(vec![q(2.0, "cups")]); "keep")]
#[test_case(EquivalentsPolicy::Replace => q(473.0, "ml"); "replace")]
#[test_case(EquivalentsPolicy::Remove => q(473.0, "ml"); "remove")]
fn equivalent_is_promoted(policy: EquivalentsPolicy) -> Quantity {
    let recipe = convert("@milk{2%cups|473%ml}", System::Metric, policy);
    let TotalQuantity::Single(total) = &recipe.ingredients[0].quantity_total else {
        panic!("expected single quantity");
    };
    total.clone()
}

#[test]
fn primary_is_converted() {
    let recipe = convert("@flour{1%lb}", System::Metric, EquivalentsPolicy::Keep);
    assert_eq!(
        recipe.ingredients[0].quantity_total,
        TotalQuantity::Single(q(454.0, "g").with_equivalents(vec![q(1.0, "lb")]))
    );

    let recipe = convert("@flour{1%lb}", System::Metric, EquivalentsPolicy::Remove);
    assert_eq!(
        recipe.ingredients[0].quantity_total,
        TotalQuantity::Single(q(454.0, "g"))
    );
}

#[test]
fn compatible_primary_stays() {
    let recipe = convert("@sugar{100%g|3.5%oz}", System::Metric, EquivalentsPolicy::Keep);
    assert_eq!(
        recipe.ingredients[0].quantity_total,
        TotalQuantity::Single(q(100.0, "g").with_equivalents(vec![q(3.5, "oz")]))
    );
}

#[test]
fn to_us_system() {
    let recipe = convert("@water{500%ml}", System::Us, EquivalentsPolicy::Remove);
    let total = &recipe.ingredients[0].quantity_total.quantities()[0];
    assert_eq!(total.unit.as_deref(), Some("c"));
}

#[test]
fn recipe_system_is_updated() {
    let recipe = convert("@flour{1%lb}", System::Metric, EquivalentsPolicy::Keep);
    assert_eq!(recipe.system, Some(System::Metric));
    assert_eq!(recipe.metadata.unit_system(), Some(System::Metric));
}

#[test]
fn context_system_sizes_ambiguous_units() {
    let recipe = convert(
        ">> unit system: uk\n@milk{1%cup}",
        System::Metric,
        EquivalentsPolicy::Remove,
    );
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "284 ml");
}

#[test]
fn unconvertible_quantities_stay() {
    let recipe = convert(
        "@salt{a pinch} and @rice{1%bag}",
        System::Metric,
        EquivalentsPolicy::Keep,
    );
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "a pinch");
    assert_eq!(recipe.ingredients[1].quantity_total.to_string(), "1 bag");
}

#[test]
fn totals_are_recomputed() {
    let recipe = convert(
        "@flour{1%lb} then @&flour{8%oz}",
        System::Metric,
        EquivalentsPolicy::Remove,
    );
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "681 g");
}

#[test]
fn original_is_not_changed() {
    let parser = CooklangParser::default();
    let recipe = parser.parse("@flour{1%lb}").unwrap();
    let _ = recipe
        .convert_to(System::Metric, EquivalentsPolicy::Keep, parser.converter())
        .unwrap();
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "1 lb");
    assert_eq!(recipe.system, None);
}

#[test]
fn addition() {
    let parser = CooklangParser::default();
    let converter = parser.converter();

    let sum = q(100.0, "g").try_add(&q(200.0, "g"), converter, None);
    assert_eq!(sum, Ok(q(300.0, "g")));

    let sum = q(1.0, "kg").try_add(&q(500.0, "g"), converter, None);
    assert_eq!(sum, Ok(q(1.5, "kg")));

    let sum = q(1.0, "lb").try_add(&q(8.0, "oz"), converter, None);
    assert_eq!(sum, Ok(q(24.0, "oz")));
}

#[test]
fn incompatible_addition() {
    let parser = CooklangParser::default();
    let converter = parser.converter();

    let err = q(100.0, "g").try_add(&q(1.0, "l"), converter, None);
    assert!(matches!(
        err,
        Err(QuantityAddError::IncompatibleUnits(
            IncompatibleUnits::DifferentPhysicalQuantities { .. }
        ))
    ));

    let err = q(100.0, "g").try_add(&q(1.0, "bag"), converter, None);
    assert!(matches!(
        err,
        Err(QuantityAddError::IncompatibleUnits(
            IncompatibleUnits::UnknownDifferentUnits { .. }
        ))
    ));
}

#[test]
fn parse_convert_and_scale() {
    let parser = CooklangParser::default();
    let recipe = parser
        .parse(">> servings: 2\n@butter{=1%oz} and @flour{8%oz}")
        .unwrap()
        .scale_to(4.0, parser.converter())
        .unwrap()
        .convert_to(System::Metric, EquivalentsPolicy::Remove, parser.converter())
        .unwrap();
    assert_eq!(recipe.ingredients[0].quantity_total.to_string(), "28.3 g");
    assert_eq!(recipe.ingredients[1].quantity_total.to_string(), "454 g");
}
