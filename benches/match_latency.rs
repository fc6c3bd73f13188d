use criterion::{criterion_group, criterion_main, Criterion};
use helios::engine::{Event, MatchOptions};
use helios::value::ConditionValue;
use helios::{compile, HeliosConfig, MatchingEngine};

fn rule_source(count: usize) -> String {
    let rules: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#"{{"rule_code": "R{i}", "priority": {i}, "conditions": [
                    {{"field": "country", "operator": "EQUAL_TO", "value": "COUNTRY_{}"}},
                    {{"field": "tier", "operator": "IS_ANY_OF", "value": ["GOLD", "SILVER"]}},
                    {{"field": "age", "operator": "BETWEEN", "value": [18, 65]}}
                ]}}"#,
                i % 50
            )
        })
        .collect();
    format!("[{}]", rules.join(","))
}

fn bench_match(c: &mut Criterion) {
    let source = rule_source(1_000);
    let report = compile(&source, &HeliosConfig::default()).unwrap();
    let engine = MatchingEngine::new(report.model);

    let hit = Event::new("hit")
        .with_attribute("country", ConditionValue::Str("COUNTRY_7".into()))
        .with_attribute("tier", ConditionValue::Str("GOLD".into()))
        .with_attribute("age", ConditionValue::Integer(30));

    let miss = Event::new("miss")
        .with_attribute("country", ConditionValue::Str("COUNTRY_UNKNOWN".into()))
        .with_attribute("tier", ConditionValue::Str("BRONZE".into()))
        .with_attribute("age", ConditionValue::Integer(99));

    let options = MatchOptions::default();

    let mut group = c.benchmark_group("match_event");
    group.bench_function("hit", |b| b.iter(|| engine.match_event(&hit, &options)));
    group.bench_function("miss", |b| b.iter(|| engine.match_event(&miss, &options)));
    group.finish();
}

criterion_group!(benches, bench_match);
criterion_main!(benches);
