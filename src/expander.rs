//! # Combination expansion (§4.2, §4.4)
//!
//! Turns a [`RuleGroup`] into the fully expanded conjunctive
//! combinations the builder will intern. `IS_ANY_OF` is a disjunction
//! packed into a single condition; expanding it into one `EQUAL_TO`
//! branch per allowed value is what lets the rest of the pipeline work
//! purely with conjunctions. `IS_NONE_OF` needs no expansion — "value
//! not in this set" is already a single predicate.
//!
//! A rule with more than one `IS_ANY_OF` condition expands as their
//! Cartesian product. `max_expansion` is the per-rule safety cap from
//! configuration (`max_is_any_of_expansion`); exceeding it aborts
//! compilation with [`CompilationError::ExpansionTooLarge`] rather than
//! silently consuming unbounded memory.

use crate::error::CompilationError;
use crate::factorizer::RuleGroup;
use crate::operator::Operator;
use crate::validator::CanonicalCondition;

/// One fully expanded conjunction of conditions, ready for predicate
/// interning. `IS_ANY_OF` has been rewritten to `EQUAL_TO`.
#[derive(Debug, Clone)]
pub struct RuleCombination {
    pub rule_code: String,
    pub priority: i64,
    pub description: Option<String>,
    pub conditions: Vec<CanonicalCondition>,
    /// Parallel to `conditions`: `Some(k)` at index `i` means
    /// `conditions[i]` is a branch of an `IS_ANY_OF` whose original list
    /// had `k` values — kept only so the builder can compute the same
    /// selectivity §4.3 assigns the un-expanded `IS_ANY_OF` condition,
    /// since the rewritten condition's own operator is `EQUAL_TO`.
    pub any_of_list_lens: Vec<Option<usize>>,
}

pub fn expand(
    groups: Vec<RuleGroup>,
    max_expansion: usize,
) -> Result<Vec<RuleCombination>, CompilationError> {
    let mut out = Vec::new();

    for group in groups {
        for member in group.members {
            if !member.enabled {
                continue;
            }

            let mut base: Vec<CanonicalCondition> = group.static_conditions.clone();
            let mut any_of: Vec<&CanonicalCondition> = Vec::new();
            for condition in &member.list_conditions {
                match condition.operator {
                    Operator::IsAnyOf => any_of.push(condition),
                    Operator::IsNoneOf => base.push(condition.clone()),
                    _ => unreachable!("factorizer only buckets IS_ANY_OF/IS_NONE_OF as list conditions"),
                }
            }
            // Every condition already in `base` (statics + IS_NONE_OF) gets a
            // `None` hint; only IS_ANY_OF branches appended below get `Some`.
            let mut partials: Vec<(Vec<CanonicalCondition>, Vec<Option<usize>>)> =
                vec![(base.clone(), vec![None; base.len()])];
            for condition in any_of {
                let values = condition
                    .value
                    .as_ref()
                    .and_then(|v| v.as_list())
                    .expect("validator guarantees IS_ANY_OF carries a non-empty list");
                let list_len = values.len();

                let next_len = partials.len() * values.len();
                if next_len > max_expansion {
                    return Err(CompilationError::ExpansionTooLarge {
                        rule_code: member.rule_code,
                        count: next_len,
                        limit: max_expansion,
                    });
                }

                let mut next = Vec::with_capacity(next_len);
                for (partial, hints) in &partials {
                    for value in values {
                        let mut branch = partial.clone();
                        branch.push(CanonicalCondition {
                            field: condition.field.clone(),
                            operator: Operator::EqualTo,
                            value: Some(value.clone()),
                        });
                        let mut branch_hints = hints.clone();
                        branch_hints.push(Some(list_len));
                        next.push((branch, branch_hints));
                    }
                }
                partials = next;
            }

            for (conditions, any_of_list_lens) in partials {
                out.push(RuleCombination {
                    rule_code: member.rule_code.clone(),
                    priority: member.priority,
                    description: member.description.clone(),
                    conditions,
                    any_of_list_lens,
                });
            }
        }
    }

    Ok(out)
}
