//! # Evaluation trace (§4.5, §6)
//!
//! Optional, per-evaluation capture of timings and predicate outcomes at
//! one of four verbosity levels. Traces are additive bookkeeping only —
//! §6 requires that "traces must not alter match results", so nothing in
//! this module feeds back into the counting algorithm.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Closed enumeration of trace verbosity (§6).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceLevel {
    /// No trace.
    #[default]
    None,
    /// Matched rule ids + stage timings.
    Basic,
    /// + per-predicate boolean outcomes.
    Standard,
    /// + expected and actual values per predicate.
    Full,
}

impl TraceLevel {
    pub fn captures_predicates(self) -> bool {
        self >= TraceLevel::Standard
    }

    pub fn captures_values(self) -> bool {
        self >= TraceLevel::Full
    }
}

/// One predicate's outcome during a single `match` call, populated from
/// `TraceLevel::Standard` upward.
#[derive(Debug, Clone, Serialize)]
pub struct PredicateOutcome {
    pub predicate_id: u32,
    pub field_id: u32,
    pub passed: bool,
    /// Populated only at `TraceLevel::Full`.
    pub expected: Option<String>,
    pub actual: Option<String>,
}

/// Per-evaluation trace buffer. Built up during `MatchingEngine::match_event`
/// and attached to the `MatchResult` when the requested level is above
/// `NONE`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    pub stage_timings: Vec<(String, Duration)>,
    pub predicate_outcomes: Vec<PredicateOutcome>,
}

impl Trace {
    pub fn record_stage(&mut self, stage: &str, elapsed: Duration) {
        self.stage_timings.push((stage.to_string(), elapsed));
    }

    pub fn record_predicate(&mut self, outcome: PredicateOutcome) {
        self.predicate_outcomes.push(outcome);
    }
}

/// One named stage of the compilation pipeline and how long it took.
/// Distinct from [`Trace`], which records a single `match_event` call;
/// this records a single `compile` call.
#[derive(Debug, Clone)]
pub struct CompileStage {
    pub name: &'static str,
    pub elapsed: Duration,
}

impl CompileStage {
    pub fn new(name: &'static str, elapsed: Duration) -> Self {
        Self { name, elapsed }
    }
}

/// Ordered record of every stage a `compile` call passed through.
#[derive(Debug, Clone, Default)]
pub struct CompileTrace {
    pub stages: Vec<CompileStage>,
}

impl CompileTrace {
    pub fn new(stages: Vec<CompileStage>) -> Self {
        Self { stages }
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_levels_order_by_verbosity() {
        assert!(TraceLevel::None < TraceLevel::Basic);
        assert!(TraceLevel::Basic < TraceLevel::Standard);
        assert!(TraceLevel::Standard < TraceLevel::Full);
    }

    #[test]
    fn only_full_captures_expected_and_actual_values() {
        assert!(!TraceLevel::Standard.captures_values());
        assert!(TraceLevel::Full.captures_values());
    }
}
