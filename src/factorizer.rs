//! # IS_ANY_OF factorization (§4.2)
//!
//! Groups rules that share an identical signature of non-list
//! conditions (everything but `IS_ANY_OF` / `IS_NONE_OF`) so the
//! Cartesian-product expansion over their list-valued conditions is
//! driven once per group instead of once per rule. This is purely a
//! compile-time efficiency pass — predicate and combination interning
//! in [`crate::builder`] already guarantee correctness without it;
//! factorization just avoids redoing the same expansion work for rules
//! that differ only in which values they allow through an `IS_ANY_OF`.
//!
//! Grounded on the teacher's `optimizer::Optimizer` rewrite passes: a
//! single group-and-replace pass over owned input, no iterative
//! fixpoint required here since grouping is idempotent in one pass.

use crate::operator::Operator;
use crate::validator::{CanonicalCondition, CanonicalRule};
use crate::value::ConditionValue;
use std::collections::HashMap;

/// A rule's membership within a [`RuleGroup`]: its own identity plus
/// the list-valued conditions that vary within the group.
#[derive(Debug, Clone)]
pub struct GroupMember {
    pub rule_code: String,
    pub priority: i64,
    pub enabled: bool,
    pub description: Option<String>,
    pub list_conditions: Vec<CanonicalCondition>,
}

/// A set of rules sharing an identical non-list condition signature.
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub static_conditions: Vec<CanonicalCondition>,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FactorizationStats {
    pub rules_considered: usize,
    pub groups_produced: usize,
}

type Signature = Vec<(String, Operator, String)>;

/// Signature key for a single condition's value. `BETWEEN` is the one
/// non-`IS_ANY_OF`/`IS_NONE_OF` operator whose value is itself a list
/// (its two bounds), so list values are formatted element-wise rather
/// than handed to `dictionary_key`, which only accepts scalars.
fn signature_value_key(value: &ConditionValue) -> String {
    match value {
        ConditionValue::List(items) => {
            let parts: Vec<String> = items.iter().map(signature_value_key).collect();
            format!("[{}]", parts.join(","))
        }
        scalar => scalar.dictionary_key(),
    }
}

fn signature_of(conditions: &[CanonicalCondition]) -> Signature {
    let mut sig: Signature = conditions
        .iter()
        .filter(|c| !matches!(c.operator, Operator::IsAnyOf | Operator::IsNoneOf))
        .map(|c| {
            let value_key = c.value.as_ref().map(signature_value_key).unwrap_or_default();
            (c.field.clone(), c.operator, value_key)
        })
        .collect();
    sig.sort();
    sig
}

/// Fold a set of validated rules into groups sharing a non-list
/// condition signature, pulling their list-valued conditions out as
/// per-member overrides.
pub fn factorize(rules: Vec<CanonicalRule>) -> (Vec<RuleGroup>, FactorizationStats) {
    let stats = FactorizationStats {
        rules_considered: rules.len(),
        ..Default::default()
    };

    let mut groups: HashMap<Signature, RuleGroup> = HashMap::new();

    for rule in rules {
        let static_conditions: Vec<CanonicalCondition> = rule
            .conditions
            .iter()
            .filter(|c| !matches!(c.operator, Operator::IsAnyOf | Operator::IsNoneOf))
            .cloned()
            .collect();
        let list_conditions: Vec<CanonicalCondition> = rule
            .conditions
            .iter()
            .filter(|c| matches!(c.operator, Operator::IsAnyOf | Operator::IsNoneOf))
            .cloned()
            .collect();

        let signature = signature_of(&rule.conditions);
        let entry = groups.entry(signature).or_insert_with(|| RuleGroup {
            static_conditions,
            members: Vec::new(),
        });
        entry.members.push(GroupMember {
            rule_code: rule.rule_code,
            priority: rule.priority,
            enabled: rule.enabled,
            description: rule.description,
            list_conditions,
        });
    }

    let groups: Vec<RuleGroup> = groups.into_values().collect();
    let stats = FactorizationStats {
        groups_produced: groups.len(),
        ..stats
    };
    (groups, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use crate::value::ConditionValue;

    fn condition(field: &str, operator: Operator, value: Option<ConditionValue>) -> CanonicalCondition {
        CanonicalCondition {
            field: field.to_string(),
            operator,
            value,
        }
    }

    fn rule(code: &str, conditions: Vec<CanonicalCondition>) -> CanonicalRule {
        CanonicalRule {
            rule_code: code.to_string(),
            description: None,
            priority: 0,
            enabled: true,
            conditions,
        }
    }

    #[test]
    fn rules_sharing_static_signature_fold_into_one_group() {
        let rules = vec![
            rule(
                "R1",
                vec![
                    condition("TIER", Operator::EqualTo, Some(ConditionValue::Str("GOLD".into()))),
                    condition(
                        "COUNTRY",
                        Operator::IsAnyOf,
                        Some(ConditionValue::List(vec![ConditionValue::Str("US".into())])),
                    ),
                ],
            ),
            rule(
                "R2",
                vec![
                    condition("TIER", Operator::EqualTo, Some(ConditionValue::Str("GOLD".into()))),
                    condition(
                        "COUNTRY",
                        Operator::IsAnyOf,
                        Some(ConditionValue::List(vec![ConditionValue::Str("CA".into())])),
                    ),
                ],
            ),
        ];

        let (groups, stats) = factorize(rules);
        assert_eq!(stats.rules_considered, 2);
        assert_eq!(stats.groups_produced, 1);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[0].static_conditions.len(), 1);
    }

    #[test]
    fn rules_with_different_static_conditions_stay_in_separate_groups() {
        let rules = vec![
            rule(
                "R1",
                vec![condition("TIER", Operator::EqualTo, Some(ConditionValue::Str("GOLD".into())))],
            ),
            rule(
                "R2",
                vec![condition("TIER", Operator::EqualTo, Some(ConditionValue::Str("SILVER".into())))],
            ),
        ];

        let (groups, stats) = factorize(rules);
        assert_eq!(stats.groups_produced, 2);
    }

    #[test]
    fn rule_with_no_list_conditions_still_forms_its_own_group() {
        let rules = vec![rule(
            "R1",
            vec![condition("TIER", Operator::EqualTo, Some(ConditionValue::Str("GOLD".into())))],
        )];
        let (groups, _) = factorize(rules);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].members[0].list_conditions.is_empty());
    }

    #[test]
    fn between_condition_does_not_panic_and_groups_by_its_bounds() {
        let rules = vec![
            rule(
                "R1",
                vec![condition(
                    "AGE",
                    Operator::Between,
                    Some(ConditionValue::List(vec![ConditionValue::Integer(18), ConditionValue::Integer(65)])),
                )],
            ),
            rule(
                "R2",
                vec![condition(
                    "AGE",
                    Operator::Between,
                    Some(ConditionValue::List(vec![ConditionValue::Integer(18), ConditionValue::Integer(65)])),
                )],
            ),
            rule(
                "R3",
                vec![condition(
                    "AGE",
                    Operator::Between,
                    Some(ConditionValue::List(vec![ConditionValue::Integer(21), ConditionValue::Integer(30)])),
                )],
            ),
        ];

        let (groups, stats) = factorize(rules);
        assert_eq!(stats.rules_considered, 3);
        assert_eq!(stats.groups_produced, 2, "same bounds fold together, different bounds stay separate");
    }
}
