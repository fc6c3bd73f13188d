//! Error kinds for compilation and evaluation.
//!
//! Mirrors the teacher's `storage::error::StorageError` shape: one
//! `thiserror` variant per distinct failure, `#[from]` conversions for
//! upstream library errors, no use of `anyhow` inside the library.

use serde::Serialize;
use thiserror::Error;

/// Errors that abort rule-set compilation, or (for `ContradictoryRule`)
/// are reported but do not abort it (see §4.1).
#[derive(Error, Debug)]
pub enum CompilationError {
    #[error("rule '{rule_code}' condition #{condition_index}: {reason}")]
    InvalidRule {
        rule_code: String,
        condition_index: usize,
        reason: String,
    },

    #[error("unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("duplicate rule_code '{0}' in input")]
    DuplicateRuleCode(String),

    #[error("invalid regex pattern in rule '{rule_code}': {source}")]
    RegexSyntax {
        rule_code: String,
        #[source]
        source: regex::Error,
    },

    #[error("internal model build invariant violated: {0}")]
    ModelBuildError(String),

    #[error("rule set expands past the configured combination cap ({limit}); rule '{rule_code}' would add its {count}th combination")]
    ExpansionTooLarge {
        rule_code: String,
        count: usize,
        limit: usize,
    },

    #[error("failed to parse rule source: {0}")]
    Json(#[from] serde_json::Error),
}

/// A rule dropped from combination generation due to a detected
/// contradiction (§4.1 blocking tier). Compilation proceeds; these are
/// collected into [`crate::CompileReport::contradictions`].
#[derive(Debug, Clone)]
pub struct ContradictoryRule {
    pub rule_code: String,
    pub reason: String,
}

impl std::fmt::Display for ContradictoryRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rule '{}' excluded: {}", self.rule_code, self.reason)
    }
}

/// Runtime evaluation errors. Isolated per event; never abort a batch.
#[derive(Error, Debug, Serialize)]
pub enum EvaluationError {
    #[error("attribute '{field}' has value of unexpected type for a numeric predicate: {value_type}")]
    TypeMismatch { field: String, value_type: String },

    #[error("event is missing required attribute '{0}'")]
    MissingAttribute(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Figment(#[from] figment::Error),
}
