//! Range evaluator: `GREATER_THAN`, `GREATER_THAN_OR_EQUAL`, `LESS_THAN`,
//! `LESS_THAN_OR_EQUAL`, `BETWEEN`.
//!
//! No shortcut comparable to equality's hashmap lookup exists here —
//! each bound is an independent inequality, so the field's range
//! predicates (ascending by weight, §4.4) are scanned in full. Integer
//! predicates compared against a float event value, or vice versa,
//! always widen to `f64` before comparing (§4.6).

use super::{apply_true_predicate, eligible};
use crate::engine::EvaluationContext;
use crate::model::EngineModel;
use crate::operator::Operator;
use crate::predicate::PredicateValue;
use roaring::RoaringBitmap;

pub(crate) fn evaluate(
    model: &EngineModel,
    field_id: u32,
    event_value: f64,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    let Some(ids) = model.range_index_for(field_id) else {
        return;
    };

    for &predicate_id in ids {
        if !eligible(eligibility, predicate_id) {
            continue;
        }
        ctx.record_predicate_evaluated();
        let predicate = model.predicate(predicate_id);
        let passed = match &predicate.key.value {
            PredicateValue::Numeric(bound) => {
                let bound = bound.as_f64();
                match predicate.key.operator {
                    Operator::GreaterThan => event_value > bound,
                    Operator::GreaterThanOrEqual => event_value >= bound,
                    Operator::LessThan => event_value < bound,
                    Operator::LessThanOrEqual => event_value <= bound,
                    _ => false,
                }
            }
            PredicateValue::Between(low, high) => {
                event_value >= low.as_f64() && event_value <= high.as_f64()
            }
            _ => false,
        };
        let actual = if ctx.wants_value_trace() { Some(event_value.to_string()) } else { None };
        ctx.trace_predicate(model, field_id, predicate_id, passed, actual);
        if passed {
            apply_true_predicate(model, predicate_id, ctx);
        }
    }
}
