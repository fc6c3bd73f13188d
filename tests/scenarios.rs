//! Literal scenario fixtures (spec §8).

use helios::engine::{Event, MatchOptions, SelectionStrategy};
use helios::value::ConditionValue;
use helios::{compile, HeliosConfig, MatchingEngine};

fn engine_for(source: &str) -> MatchingEngine {
    let report = compile(source, &HeliosConfig::default()).unwrap();
    MatchingEngine::new(report.model)
}

#[test]
fn scenario_a_equal_to_match() {
    let engine = engine_for(
        r#"[{"rule_code": "R1", "priority": 50, "conditions": [
            {"field": "country", "operator": "EQUAL_TO", "value": "US"},
            {"field": "amount", "operator": "GREATER_THAN", "value": 1000}
        ]}]"#,
    );
    let event = Event::new("e1")
        .with_attribute("country", ConditionValue::Str("us".into()))
        .with_attribute("amount", ConditionValue::Integer(1500));
    let result = engine.match_event(&event, &MatchOptions::default());
    assert_eq!(result.matched_rules.len(), 1);
    assert_eq!(result.matched_rules[0].rule_code, "R1");
    assert!(result.predicates_evaluated >= 2);
}

#[test]
fn scenario_b_is_any_of_expansion_and_dedup() {
    let report = compile(
        r#"[
            {"rule_code": "R1", "conditions": [
                {"field": "country", "operator": "IS_ANY_OF", "value": ["US", "CA"]},
                {"field": "tier", "operator": "EQUAL_TO", "value": "GOLD"}
            ]},
            {"rule_code": "R2", "conditions": [
                {"field": "country", "operator": "IS_ANY_OF", "value": ["CA", "MX"]},
                {"field": "tier", "operator": "EQUAL_TO", "value": "GOLD"}
            ]}
        ]"#,
        &HeliosConfig::default(),
    )
    .unwrap();
    assert_eq!(report.model.combination_count(), 3, "US∧GOLD, CA∧GOLD, MX∧GOLD dedup to 3");

    let engine = MatchingEngine::new(report.model);
    let event = Event::new("e1")
        .with_attribute("country", ConditionValue::Str("CA".into()))
        .with_attribute("tier", ConditionValue::Str("GOLD".into()));
    let result = engine.match_event(&event, &MatchOptions::default());
    let codes: Vec<&str> = result.matched_rules.iter().map(|r| r.rule_code.as_str()).collect();
    assert!(codes.contains(&"R1"));
    assert!(codes.contains(&"R2"));
}

#[test]
fn scenario_c_contradiction_excluded() {
    let report = compile(
        r#"[{"rule_code": "R1", "conditions": [
            {"field": "x", "operator": "GREATER_THAN", "value": 100},
            {"field": "x", "operator": "LESS_THAN", "value": 50}
        ]}]"#,
        &HeliosConfig::default(),
    )
    .unwrap();
    assert!(!report.contradictions.is_empty());
    assert!(report.model.combinations_for_rule("R1").is_empty());

    let engine = MatchingEngine::new(report.model);
    let event = Event::new("e1").with_attribute("x", ConditionValue::Integer(75));
    let result = engine.match_event(&event, &MatchOptions::default());
    assert!(result.matched_rules.is_empty());
}

#[test]
fn scenario_d_between_inclusive() {
    let engine = engine_for(
        r#"[{"rule_code": "R1", "conditions": [
            {"field": "age", "operator": "BETWEEN", "value": [18, 65]}
        ]}]"#,
    );
    let matches = |age: i64| {
        let event = Event::new("e").with_attribute("age", ConditionValue::Integer(age));
        !engine.match_event(&event, &MatchOptions::default()).matched_rules.is_empty()
    };
    assert!(matches(18));
    assert!(matches(65));
    assert!(!matches(17));
    assert!(!matches(66));
}

#[test]
fn scenario_e_priority_ordering() {
    let engine = engine_for(
        r#"[
            {"rule_code": "R1", "priority": 10, "conditions": [{"field": "x", "operator": "EQUAL_TO", "value": "A"}]},
            {"rule_code": "R2", "priority": 100, "conditions": [{"field": "x", "operator": "EQUAL_TO", "value": "A"}]}
        ]"#,
    );
    let event = Event::new("e").with_attribute("x", ConditionValue::Str("A".into()));

    let all = engine.match_event(&event, &MatchOptions::default());
    let codes: Vec<&str> = all.matched_rules.iter().map(|r| r.rule_code.as_str()).collect();
    assert_eq!(codes, vec!["R2", "R1"]);

    let first = engine.match_event(
        &event,
        &MatchOptions { strategy: SelectionStrategy::FirstMatch, ..Default::default() },
    );
    let codes: Vec<&str> = first.matched_rules.iter().map(|r| r.rule_code.as_str()).collect();
    assert_eq!(codes, vec!["R2"]);
}

#[test]
fn scenario_f_absent_attribute() {
    let engine = engine_for(
        r#"[{"rule_code": "R1", "conditions": [
            {"field": "status", "operator": "IS_NULL"}
        ]}]"#,
    );
    let absent = Event::new("e1");
    let present = Event::new("e2").with_attribute("status", ConditionValue::Str("A".into()));
    assert_eq!(engine.match_event(&absent, &MatchOptions::default()).matched_rules.len(), 1);
    assert_eq!(engine.match_event(&present, &MatchOptions::default()).matched_rules.len(), 0);
}
