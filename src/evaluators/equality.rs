//! Equality evaluator: `EQUAL_TO`, `NOT_EQUAL_TO`, `IS_NONE_OF`.
//!
//! `EQUAL_TO` predicates for a field are looked up in a single
//! `HashMap<encoded_value, Vec<predicate_id>>`, so an event attribute
//! only ever triggers the handful of predicates that actually match its
//! value, never the whole field's predicate list. Fields whose sole
//! predicate is a single `EQUAL_TO` value skip the hashmap entirely
//! (`single_predicate`, §4.6's "single-predicate fields use a one-shot
//! fast path"). `NOT_EQUAL_TO` has no such shortcut — each forbidden
//! value is independent — so its predicates are kept in a
//! selectivity-descending array and scanned in full.

use super::{apply_true_predicate, eligible};
use crate::engine::EvaluationContext;
use crate::model::EngineModel;
use crate::predicate::PredicateValue;
use roaring::RoaringBitmap;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct EqualityFieldIndex {
    pub(crate) by_value: HashMap<u32, Vec<u32>>,
    pub(crate) not_equal: Vec<u32>,
    pub(crate) none_of: Vec<u32>,
    /// Set when this field carries exactly one `EQUAL_TO` predicate and
    /// nothing else: `(expected_value_id, predicate_id)`.
    pub(crate) single_predicate: Option<(u32, u32)>,
}

impl EqualityFieldIndex {
    pub(crate) fn none_of(&self) -> &[u32] {
        &self.none_of
    }

    pub(crate) fn finalize_fast_path(&mut self) {
        if self.not_equal.is_empty() && self.none_of.is_empty() && self.by_value.len() == 1 {
            if let Some((&value_id, ids)) = self.by_value.iter().next() {
                if ids.len() == 1 {
                    self.single_predicate = Some((value_id, ids[0]));
                }
            }
        }
    }
}

pub(crate) fn evaluate(
    model: &EngineModel,
    field_id: u32,
    encoded_value: u32,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    let Some(index) = model.equality_index_for(field_id) else {
        return;
    };

    if let Some((expected, predicate_id)) = index.single_predicate {
        if eligible(eligibility, predicate_id) {
            ctx.record_predicate_evaluated();
            let passed = encoded_value == expected;
            let actual = decoded_actual(ctx, model, encoded_value);
            ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
            if passed {
                apply_true_predicate(model, predicate_id, ctx);
            }
        }
        return;
    }

    if let Some(ids) = index.by_value.get(&encoded_value) {
        for &predicate_id in ids {
            if !eligible(eligibility, predicate_id) {
                continue;
            }
            ctx.record_predicate_evaluated();
            let actual = decoded_actual(ctx, model, encoded_value);
            ctx.trace_predicate(model, field_id, predicate_id, true, actual);
            apply_true_predicate(model, predicate_id, ctx);
        }
    }

    for &predicate_id in &index.not_equal {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        let forbidden = match &model.predicate(predicate_id).key.value {
            PredicateValue::NotEqual(v) => *v,
            _ => continue,
        };
        let passed = encoded_value != forbidden;
        let actual = decoded_actual(ctx, model, encoded_value);
        ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
        if passed {
            apply_true_predicate(model, predicate_id, ctx);
        }
    }

    for &predicate_id in &index.none_of {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        let passed = match &model.predicate(predicate_id).key.value {
            PredicateValue::NoneOf(set) => set.binary_search(&encoded_value).is_err(),
            _ => continue,
        };
        let actual = decoded_actual(ctx, model, encoded_value);
        ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
        if passed {
            apply_true_predicate(model, predicate_id, ctx);
        }
    }
}

/// `IS_NONE_OF` predicates on a field the event never mentioned: an
/// absent value can never belong to the forbidden set, so every such
/// predicate is unconditionally true (Open Question #3).
pub(crate) fn evaluate_absent(
    model: &EngineModel,
    field_id: u32,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    for &predicate_id in model.none_of_predicates_for_field(field_id) {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        ctx.trace_predicate(model, field_id, predicate_id, true, None);
        apply_true_predicate(model, predicate_id, ctx);
    }
}

fn decoded_actual(ctx: &EvaluationContext, model: &EngineModel, encoded_value: u32) -> Option<String> {
    if ctx.wants_value_trace() {
        model.decode_value(encoded_value).map(str::to_string)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_path_set_only_when_field_has_a_single_equal_to_and_nothing_else() {
        let mut index = EqualityFieldIndex::default();
        index.by_value.insert(7, vec![3]);
        index.finalize_fast_path();
        assert_eq!(index.single_predicate, Some((7, 3)));
    }

    #[test]
    fn fast_path_skipped_when_not_equal_predicates_are_also_present() {
        let mut index = EqualityFieldIndex::default();
        index.by_value.insert(7, vec![3]);
        index.not_equal.push(9);
        index.finalize_fast_path();
        assert_eq!(index.single_predicate, None);
    }
}
