//! # Evaluators (§4.5, §4.6)
//!
//! One module per operator family, each built as a free function over a
//! field-scoped slice of predicates rather than a trait object — there
//! is no dynamic dispatch on the matching path, only a fixed set of
//! match arms the compiler can inline. Every evaluator shares the same
//! shape: given a field's predicates and the event's value for that
//! field, mark the predicates that hold true by bumping their owning
//! combinations through the inverted index (`apply_true_predicate`).
//!
//! The four specialized per-field indices these evaluators read
//! (`equality_index`, `range_index`, `string_index`, `null_index`) are
//! derived once, at [`crate::builder::EngineModelBuilder::freeze`] time,
//! by [`build_field_indices`] — not recomputed per match call.

pub mod equality;
pub mod null_ops;
pub mod range;
pub mod string_ops;

use crate::engine::EvaluationContext;
use crate::model::EngineModel;
use crate::operator::Operator;
use crate::predicate::Predicate;
use roaring::RoaringBitmap;
use std::collections::HashMap;

pub use equality::EqualityFieldIndex;

/// The four per-field evaluator indices, bundled for a single move into
/// [`crate::model::EngineModel`].
#[derive(Debug, Default)]
pub struct FieldIndices {
    pub equality: HashMap<u32, EqualityFieldIndex>,
    pub range: HashMap<u32, Vec<u32>>,
    pub string_ops: HashMap<u32, Vec<u32>>,
    pub null_ops: HashMap<u32, Vec<u32>>,
}

/// Bucket every predicate into its evaluator's index by field id and
/// operator family, then apply the equality evaluator's single-predicate
/// fast path and its selectivity-descending `NOT_EQUAL_TO` ordering.
pub(crate) fn build_field_indices(predicates: &[Predicate]) -> FieldIndices {
    let mut indices = FieldIndices::default();

    for predicate in predicates {
        let field_id = predicate.field_id();
        match predicate.operator() {
            Operator::EqualTo => {
                let entry = indices.equality.entry(field_id).or_default();
                if let crate::predicate::PredicateValue::Equal(value_id) = &predicate.key.value {
                    entry.by_value.entry(*value_id).or_default().push(predicate.id);
                }
            }
            Operator::NotEqualTo => {
                indices.equality.entry(field_id).or_default().not_equal.push(predicate.id);
            }
            Operator::IsNoneOf => {
                indices.equality.entry(field_id).or_default().none_of.push(predicate.id);
            }
            Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual
            | Operator::Between => {
                indices.range.entry(field_id).or_default().push(predicate.id);
            }
            Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::Regex => {
                indices.string_ops.entry(field_id).or_default().push(predicate.id);
            }
            Operator::IsNull | Operator::IsNotNull => {
                indices.null_ops.entry(field_id).or_default().push(predicate.id);
            }
            Operator::IsAnyOf => unreachable!("IS_ANY_OF is rewritten before interning"),
        }
    }

    for index in indices.equality.values_mut() {
        index.not_equal.sort_by(|&a, &b| {
            predicates[b as usize]
                .selectivity
                .partial_cmp(&predicates[a as usize].selectivity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        index.finalize_fast_path();
    }

    indices
}

pub(crate) fn eligible(eligibility: Option<&RoaringBitmap>, predicate_id: u32) -> bool {
    eligibility.is_none_or(|set| set.contains(predicate_id))
}

/// Bump every combination that requires `predicate_id` now that it has
/// evaluated true for this event.
pub(crate) fn apply_true_predicate(model: &EngineModel, predicate_id: u32, ctx: &mut EvaluationContext) {
    if let Some(bitmap) = model.combinations_requiring(predicate_id) {
        for combination_id in bitmap.iter() {
            ctx.increment(combination_id);
        }
    }
}
