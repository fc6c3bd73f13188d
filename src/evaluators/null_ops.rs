//! Null evaluator: `IS_NULL`, `IS_NOT_NULL`.
//!
//! The only evaluator that runs on fields *absent* from the event:
//! `IS_NULL` means "the attribute is missing", `IS_NOT_NULL` means "the
//! attribute is present", so `MatchingEngine::match_event` calls this
//! once for every visited field with a present value and again, with
//! `present = false`, for every field carrying a null-check predicate
//! that the event never mentioned.

use super::{apply_true_predicate, eligible};
use crate::engine::EvaluationContext;
use crate::model::EngineModel;
use crate::operator::Operator;
use roaring::RoaringBitmap;

pub(crate) fn evaluate(
    model: &EngineModel,
    field_id: u32,
    present: bool,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    let Some(ids) = model.null_index_for(field_id) else {
        return;
    };

    for &predicate_id in ids {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        let operator = model.predicate(predicate_id).key.operator;
        let passed = match operator {
            Operator::IsNull => !present,
            Operator::IsNotNull => present,
            _ => false,
        };
        let actual = if ctx.wants_value_trace() {
            Some(if present { "PRESENT".to_string() } else { "ABSENT".to_string() })
        } else {
            None
        };
        ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
        if passed {
            apply_true_predicate(model, predicate_id, ctx);
        }
    }
}
