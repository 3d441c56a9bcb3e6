use cooklang_parser::{
    convert::{EquivalentsPolicy, System},
    CooklangParser, Converter, Quantity, Value,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn input() -> Vec<Quantity> {
    vec![
        (1.5, "tsp"),
        (2.0, "tsp"),
        (3.0, "tsp"),
        (3.5, "tbsp"),
        (300.0, "ml"),
        (1.5, "l"),
        (20.0, "g"),
        (1.0, "lb"),
    ]
    .into_iter()
    .map(|(v, u)| Quantity::new(Value::from(v), Some(u.to_string())))
    .collect()
}

fn to_system(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_system");
    let converter = Converter::default();
    let input = black_box(input());

    for system in [System::Metric, System::Us, System::Uk] {
        group.bench_function(system.to_string(), |b| {
            b.iter(|| {
                for q in &input {
                    let _ = converter.convert_to_system(q, system, None);
                }
            })
        });
    }
}

fn addition(c: &mut Criterion) {
    let mut group = c.benchmark_group("addition");
    let converter = Converter::default();
    let input = black_box(input());

    group.bench_function("pairwise", |b| {
        b.iter(|| {
            for pair in input.windows(2) {
                let _ = pair[0].try_add(&pair[1], &converter, None);
            }
        })
    });
}

fn recipe(c: &mut Criterion) {
    let mut group = c.benchmark_group("recipe");
    let parser = CooklangParser::default();
    let recipe = parser
        .parse(include_str!("./test_recipe.cook"))
        .expect("bench recipe parses");

    group.bench_function("convert_to", |b| {
        b.iter(|| recipe.convert_to(System::Us, EquivalentsPolicy::Keep, parser.converter()))
    });
    group.bench_function("scale_by", |b| {
        b.iter(|| recipe.scale_by(2.5, parser.converter()))
    });
}

criterion_group!(benches, to_system, addition, recipe);
criterion_main!(benches);
