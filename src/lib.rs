//! # Helios
//!
//! Helios compiles declarative rule sets — flat conjunctions of
//! field/operator/value conditions — into an immutable, dictionary
//! encoded, inverted-indexed [`model::EngineModel`], then evaluates
//! events against it with a counting algorithm: every true predicate
//! bumps a per-combination counter, and a combination fires once its
//! counter reaches its required predicate count.
//!
//! ```
//! use helios::{compile, HeliosConfig, MatchingEngine, Event, MatchOptions};
//! use helios::value::ConditionValue;
//!
//! let source = r#"[{"rule_code": "R1", "priority": 10, "conditions": [
//!     {"field": "country", "operator": "EQUAL_TO", "value": "US"}
//! ]}]"#;
//!
//! let report = compile(source, &HeliosConfig::default()).unwrap();
//! let engine = MatchingEngine::new(report.model);
//!
//! let event = Event::new("evt-1").with_attribute("country", ConditionValue::Str("US".into()));
//! let result = engine.match_event(&event, &MatchOptions::default());
//! assert_eq!(result.matched_rules[0].rule_code, "R1");
//! ```

pub mod builder;
pub mod config;
pub mod dictionary;
pub mod engine;
pub mod error;
pub mod evaluators;
pub mod expander;
pub mod factorizer;
pub mod index;
pub mod metrics;
pub mod model;
pub mod operator;
pub mod predicate;
pub mod rule;
pub mod selectivity;
pub mod trace;
pub mod validator;
pub mod value;

pub use config::HeliosConfig;
pub use engine::{Event, MatchOptions, MatchResult, MatchingEngine, SelectionStrategy};
pub use error::{CompilationError, ContradictoryRule, EvaluationError};
pub use model::{EngineModel, ModelHandle};
pub use trace::{CompileStage, CompileTrace, TraceLevel};

use crate::factorizer::FactorizationStats;
use std::time::{Duration, Instant};
use tracing::info;

/// Everything a successful [`compile`] call produces: the frozen model
/// ready to wrap in a [`MatchingEngine`], the contradictions the
/// validator warned about and excluded, factorization bookkeeping, and
/// a per-stage compilation trace.
#[derive(Debug)]
pub struct CompileReport {
    pub model: EngineModel,
    pub contradictions: Vec<ContradictoryRule>,
    pub factorization_stats: FactorizationStats,
    pub trace: CompileTrace,
}

/// Run the full compilation pipeline — LOAD, VALIDATE, ENCODE_DICTS,
/// PROFILE_SELECTIVITY, FACTORIZE, EXPAND_AND_INTERN, INDEX_AND_FREEZE —
/// over a rule source document, producing a ready-to-serve
/// [`CompileReport`]. `ENCODE_DICTS`/`PROFILE_SELECTIVITY` run over the
/// validated rules directly, ahead of `FACTORIZE`, since `factorize`
/// consumes its input by value and neither stage depends on the
/// other's output.
pub fn compile(source: &str, config: &HeliosConfig) -> Result<CompileReport, CompilationError> {
    let overall_start = Instant::now();
    let mut stages = Vec::new();

    let t = Instant::now();
    let definitions = rule::parse_rule_source(source)?;
    stages.push(CompileStage::new("LOAD", t.elapsed()));

    let t = Instant::now();
    let validated = validator::validate(definitions)?;
    stages.push(CompileStage::new("VALIDATE", t.elapsed()));

    let t = Instant::now();
    let (field_dictionary, profile) = builder::profile_fields(&validated.rules);
    stages.push(CompileStage::new("ENCODE_DICTS", t.elapsed()));
    stages.push(CompileStage::new("PROFILE_SELECTIVITY", Duration::ZERO));

    let t = Instant::now();
    let (groups, factorization_stats) = factorizer::factorize(validated.rules);
    stages.push(CompileStage::new("FACTORIZE", t.elapsed()));

    let t = Instant::now();
    let combinations = expander::expand(groups, config.builder.max_is_any_of_expansion)?;
    let mut model_builder =
        builder::EngineModelBuilder::new(field_dictionary, dictionary::Dictionary::new());
    model_builder.register(combinations, &profile)?;
    stages.push(CompileStage::new("EXPAND_AND_INTERN", t.elapsed()));

    let t = Instant::now();
    let model = model_builder.freeze(overall_start);
    stages.push(CompileStage::new("INDEX_AND_FREEZE", t.elapsed()));

    info!(
        unique_combinations = model.stats().unique_combinations,
        total_predicates = model.stats().total_predicates,
        logical_rules = model.stats().logical_rules,
        contradictions = validated.contradictions.len(),
        total_time_ns = overall_start.elapsed().as_nanos() as u64,
        "compilation READY"
    );

    Ok(CompileReport {
        model,
        contradictions: validated.contradictions,
        factorization_stats,
        trace: CompileTrace::new(stages),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConditionValue;

    #[test]
    fn compile_then_match_round_trips_a_simple_rule() {
        let source = r#"[{"rule_code": "R1", "priority": 10, "conditions": [
            {"field": "country", "operator": "EQUAL_TO", "value": "US"}
        ]}]"#;
        let report = compile(source, &HeliosConfig::default()).unwrap();
        assert_eq!(report.model.stats().logical_rules, 1);
        assert!(report.contradictions.is_empty());

        let engine = MatchingEngine::new(report.model);
        let event = Event::new("e1").with_attribute("country", ConditionValue::Str("us".into()));
        let result = engine.match_event(&event, &MatchOptions::default());
        assert_eq!(result.matched_rules.len(), 1);
        assert_eq!(result.matched_rules[0].rule_code, "R1");
    }

    #[test]
    fn compile_reports_contradictions_without_failing() {
        let source = r#"[{"rule_code": "R1", "conditions": [
            {"field": "age", "operator": "GREATER_THAN", "value": 100},
            {"field": "age", "operator": "LESS_THAN", "value": 10}
        ]}]"#;
        let report = compile(source, &HeliosConfig::default()).unwrap();
        assert!(!report.contradictions.is_empty());
        assert_eq!(report.model.stats().logical_rules, 0);
    }

    #[test]
    fn compile_trace_records_every_pipeline_stage() {
        let source = r#"[{"rule_code": "R1", "conditions": []}]"#;
        let report = compile(source, &HeliosConfig::default()).unwrap();
        let stage_names: Vec<&str> = report.trace.stages.iter().map(|s| s.name).collect();
        assert_eq!(
            stage_names,
            vec![
                "LOAD",
                "VALIDATE",
                "ENCODE_DICTS",
                "PROFILE_SELECTIVITY",
                "FACTORIZE",
                "EXPAND_AND_INTERN",
                "INDEX_AND_FREEZE",
            ]
        );
    }

    #[test]
    fn expansion_past_configured_cap_aborts_compilation() {
        let source = r#"[{"rule_code": "R1", "conditions": [
            {"field": "country", "operator": "IS_ANY_OF", "value": ["US", "CA", "FR"]}
        ]}]"#;
        let mut config = HeliosConfig::default();
        config.builder.max_is_any_of_expansion = 2;
        let err = compile(source, &config).unwrap_err();
        assert!(matches!(err, CompilationError::ExpansionTooLarge { .. }));
    }

    #[test]
    fn duplicate_rule_code_aborts_compilation() {
        let source = r#"[
            {"rule_code": "R1", "conditions": []},
            {"rule_code": "R1", "conditions": []}
        ]"#;
        let err = compile(source, &HeliosConfig::default()).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateRuleCode(_)));
    }
}
