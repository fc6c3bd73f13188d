//! # Frozen engine model (§3, §4.4, §5)
//!
//! `EngineModel` is the immutable, dictionary-encoded, inverted-indexed
//! representation a compiled rule set is turned into. It never mutates
//! after construction; a new rule set produces a brand new `EngineModel`
//! which is published atomically through [`ModelHandle`].
//!
//! Grounded on the teacher's `storage_engine::snapshot::KnowledgeGraphSnapshot`,
//! which documented an `ArcSwap`-based publish path but never actually
//! wired one up (no `arc_swap` import anywhere in that module). This is
//! that documented intent, finally implemented.

use crate::dictionary::Dictionary;
use crate::evaluators::EqualityFieldIndex;
use crate::index::InvertedIndex;
use crate::predicate::Predicate;
use arc_swap::ArcSwap;
use roaring::RoaringBitmap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One logical rule that a combination, if fully satisfied, activates.
#[derive(Debug, Clone)]
pub struct RuleRef {
    pub rule_code: String,
    pub priority: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub unique_combinations: usize,
    pub total_predicates: usize,
    pub compilation_time_ns: u64,
    pub deduplication_rate: f64,
    pub logical_rules: usize,
}

/// The compiled, immutable engine state evaluated against every event.
#[derive(Debug)]
pub struct EngineModel {
    pub(crate) field_dictionary: Dictionary,
    pub(crate) value_dictionary: Dictionary,
    pub(crate) predicates: Vec<Predicate>,
    /// field_id -> predicate ids referencing that field, ascending by weight.
    pub(crate) fields: HashMap<u32, Vec<u32>>,
    /// combination_id -> predicate ids required by that combination.
    pub(crate) combination_predicates: Vec<Vec<u32>>,
    /// combination_id -> number of predicates required (len of the above).
    pub(crate) predicate_counts: Vec<u32>,
    /// combination_id -> logical rules this combination fully activates.
    pub(crate) combination_rules: Vec<Vec<RuleRef>>,
    /// rule_code -> combination ids it expanded into, for `explain()`.
    pub(crate) rule_combinations: HashMap<String, Vec<u32>>,
    pub(crate) index: InvertedIndex,
    /// field_id -> minimum weight among that field's predicates, used to
    /// prune fields that can never contribute a cheaper evaluation.
    pub(crate) field_min_weight: HashMap<u32, f64>,
    /// Per-field evaluator indices (§4.6), built once at freeze time.
    pub(crate) equality_index: HashMap<u32, EqualityFieldIndex>,
    pub(crate) range_index: HashMap<u32, Vec<u32>>,
    pub(crate) string_index: HashMap<u32, Vec<u32>>,
    pub(crate) null_index: HashMap<u32, Vec<u32>>,
    /// Combinations with zero required predicates — rules authored with
    /// an empty condition list match every event unconditionally.
    pub(crate) always_match: Vec<u32>,
    pub(crate) stats: EngineStats,
}

impl EngineModel {
    pub fn field_id(&self, field: &str) -> u32 {
        self.field_dictionary.lookup(field)
    }

    pub fn value_id(&self, value: &str) -> u32 {
        self.value_dictionary.lookup(value)
    }

    pub fn predicate(&self, predicate_id: u32) -> &Predicate {
        &self.predicates[predicate_id as usize]
    }

    pub fn predicates_for_field(&self, field_id: u32) -> &[u32] {
        self.fields.get(&field_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn combination_count(&self) -> usize {
        self.combination_predicates.len()
    }

    pub fn predicate_count_for(&self, combination_id: u32) -> u32 {
        self.predicate_counts[combination_id as usize]
    }

    pub fn rules_for(&self, combination_id: u32) -> &[RuleRef] {
        &self.combination_rules[combination_id as usize]
    }

    /// Combination ids that logical rule `rule_code` expanded into, for
    /// `explain()`. Empty slice if the rule is unknown or was dropped
    /// (contradiction, empty factorization) during compilation.
    pub fn combinations_for_rule(&self, rule_code: &str) -> &[u32] {
        self.rule_combinations
            .get(rule_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn min_weight_for_field(&self, field_id: u32) -> Option<f64> {
        self.field_min_weight.get(&field_id).copied()
    }

    pub fn decode_value(&self, value_id: u32) -> Option<&str> {
        self.value_dictionary.decode(value_id)
    }

    pub(crate) fn combinations_requiring(&self, predicate_id: u32) -> Option<&RoaringBitmap> {
        self.index.combinations_for(predicate_id)
    }

    pub(crate) fn equality_index_for(&self, field_id: u32) -> Option<&EqualityFieldIndex> {
        self.equality_index.get(&field_id)
    }

    pub(crate) fn range_index_for(&self, field_id: u32) -> Option<&[u32]> {
        self.range_index.get(&field_id).map(Vec::as_slice)
    }

    pub(crate) fn string_index_for(&self, field_id: u32) -> Option<&[u32]> {
        self.string_index.get(&field_id).map(Vec::as_slice)
    }

    pub(crate) fn null_index_for(&self, field_id: u32) -> Option<&[u32]> {
        self.null_index.get(&field_id).map(Vec::as_slice)
    }

    /// Fields carrying at least one `IS_NULL`/`IS_NOT_NULL` predicate.
    /// The matching engine walks this after processing an event's own
    /// attributes, to evaluate null-checks for fields the event never
    /// mentioned.
    pub(crate) fn fields_with_null_predicates(&self) -> impl Iterator<Item = u32> + '_ {
        self.null_index.keys().copied()
    }

    /// Fields carrying at least one `IS_NONE_OF` predicate. An absent
    /// attribute trivially satisfies "value not in this set" (Open
    /// Question #3: absent implies not-equal-to-any), so these need the
    /// same unvisited-field sweep as null-check predicates.
    pub(crate) fn fields_with_none_of_predicates(&self) -> impl Iterator<Item = u32> + '_ {
        self.equality_index
            .iter()
            .filter(|(_, index)| !index.none_of().is_empty())
            .map(|(&field_id, _)| field_id)
    }

    pub(crate) fn none_of_predicates_for_field(&self, field_id: u32) -> &[u32] {
        self.equality_index
            .get(&field_id)
            .map(EqualityFieldIndex::none_of)
            .unwrap_or(&[])
    }

    pub(crate) fn always_match_combinations(&self) -> &[u32] {
        &self.always_match
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }
}

/// Lock-free publication point for the current [`EngineModel`]. Many
/// readers call [`ModelHandle::load`] concurrently with zero contention;
/// a compiler thread calls [`ModelHandle::store`] once a new model is
/// ready, and in-flight reads keep evaluating against the snapshot they
/// already loaded.
pub struct ModelHandle {
    inner: ArcSwap<EngineModel>,
}

impl ModelHandle {
    pub fn new(model: EngineModel) -> Self {
        Self {
            inner: ArcSwap::from_pointee(model),
        }
    }

    pub fn load(&self) -> Arc<EngineModel> {
        self.inner.load_full()
    }

    pub fn store(&self, model: EngineModel) {
        self.inner.store(Arc::new(model));
    }
}

pub(crate) fn compilation_stats(
    unique_combinations: usize,
    total_predicates: usize,
    compilation_time: Duration,
    predicate_references: usize,
    logical_rules: usize,
) -> EngineStats {
    let deduplication_rate = if predicate_references == 0 {
        0.0
    } else {
        1.0 - (total_predicates as f64 / predicate_references as f64)
    };
    EngineStats {
        unique_combinations,
        total_predicates,
        compilation_time_ns: compilation_time.as_nanos() as u64,
        deduplication_rate,
        logical_rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplication_rate_is_zero_with_no_duplication() {
        let stats = compilation_stats(1, 5, Duration::from_secs(0), 5, 1);
        assert_eq!(stats.deduplication_rate, 0.0);
    }

    #[test]
    fn deduplication_rate_reflects_shared_predicates() {
        let stats = compilation_stats(1, 5, Duration::from_secs(0), 10, 1);
        assert!((stats.deduplication_rate - 0.5).abs() < 1e-9);
    }
}
