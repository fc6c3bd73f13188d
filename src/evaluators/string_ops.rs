//! String evaluator: `CONTAINS`, `STARTS_WITH`, `ENDS_WITH`, `REGEX`.
//!
//! Case-insensitive equality semantics propagate here the same way they
//! do for equality predicates: operand strings were uppercased at
//! canonicalization time (§4.1), and the event's string value is
//! uppercased once by the caller and reused across every predicate on
//! the field rather than re-uppercased per predicate. `REGEX` patterns
//! are preserved verbatim and compiled once, at build time
//! (`Predicate::compiled_pattern`) — matched here against that same
//! uppercased haystack, so a pattern intending case-sensitive matching
//! must account for that itself.

use super::{apply_true_predicate, eligible};
use crate::engine::EvaluationContext;
use crate::model::EngineModel;
use crate::operator::Operator;
use crate::predicate::PredicateValue;
use roaring::RoaringBitmap;

pub(crate) fn evaluate(
    model: &EngineModel,
    field_id: u32,
    uppercased_value: &str,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    let Some(ids) = model.string_index_for(field_id) else {
        return;
    };

    for &predicate_id in ids {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        let predicate = model.predicate(predicate_id);
        let passed = match (&predicate.key.value, predicate.key.operator) {
            (PredicateValue::Str(needle), Operator::Contains) => uppercased_value.contains(needle.as_str()),
            (PredicateValue::Str(needle), Operator::StartsWith) => uppercased_value.starts_with(needle.as_str()),
            (PredicateValue::Str(needle), Operator::EndsWith) => uppercased_value.ends_with(needle.as_str()),
            (PredicateValue::Regex(_), Operator::Regex) => predicate
                .compiled_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(uppercased_value)),
            _ => false,
        };
        let actual = if ctx.wants_value_trace() { Some(uppercased_value.to_string()) } else { None };
        ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
        if passed {
            apply_true_predicate(model, predicate_id, ctx);
        }
    }
}
