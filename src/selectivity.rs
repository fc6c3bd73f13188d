//! # Selectivity profile (§4.3)
//!
//! Tracks per-field incidence across the rule set being compiled and
//! turns it, together with the operator's fixed selectivity factor,
//! into a `selectivity` and `weight` for each predicate. Weight drives
//! the ascending evaluation order used by the matching engine (§4.5).
//!
//! Grounded on the teacher's `statistics::StatisticsManager`: one
//! incidence counter per column, refreshed as rules are folded in,
//! then queried once compilation moves to predicate construction.

use crate::operator::Operator;
use std::collections::HashMap;

/// Running incidence counts, built up while rules are being folded into
/// the model, then frozen and queried during predicate construction.
#[derive(Debug, Default)]
pub struct SelectivityProfile {
    /// field_id -> number of rules referencing that field at least once.
    field_incidence: HashMap<u32, u64>,
    total_rules: u64,
}

impl SelectivityProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `field_id` is referenced by the rule currently being
    /// folded in. Call once per distinct field per rule, not once per
    /// condition — a rule with two conditions on the same field must
    /// only increment that field's incidence by one.
    pub fn record_field_reference(&mut self, field_id: u32) {
        *self.field_incidence.entry(field_id).or_insert(0) += 1;
    }

    pub fn record_rule(&mut self) {
        self.total_rules += 1;
    }

    fn incidence_ratio(&self, field_id: u32) -> f64 {
        if self.total_rules == 0 {
            return 0.0;
        }
        let count = self.field_incidence.get(&field_id).copied().unwrap_or(0);
        (count as f64 / self.total_rules as f64).min(1.0)
    }

    /// `selectivity = min(1, field_incidence / total_rules) * operator_factor`
    pub fn selectivity(&self, field_id: u32, operator: Operator, list_len: usize) -> f64 {
        self.incidence_ratio(field_id) * operator.selectivity_factor(list_len)
    }

    /// `weight = (1 - selectivity) * cost(operator)`
    pub fn weight(&self, selectivity: f64, operator: Operator) -> f64 {
        (1.0 - selectivity) * operator.cost()
    }
}
