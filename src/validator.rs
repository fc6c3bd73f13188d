//! # Validator and Canonicalizer (§4.1)
//!
//! Turns parsed rule source into a list of canonicalized rules or an
//! aggregated [`CompilationError`]. Also runs contradiction detection:
//! a warning tier that logs and keeps the rule, and a blocking tier
//! that excludes the rule from combination generation with a warning
//! but does not fail compilation.

use crate::error::{CompilationError, ContradictoryRule};
use crate::operator::Operator;
use crate::rule::{Condition, RuleDefinition};
use crate::value::ConditionValue;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::warn;

/// A condition after field-name and string-value canonicalization, with
/// its operator resolved out of the closed set.
#[derive(Debug, Clone)]
pub struct CanonicalCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Option<ConditionValue>,
}

/// A rule after canonicalization. Same shape as [`RuleDefinition`] but
/// with conditions validated and normalized.
#[derive(Debug, Clone)]
pub struct CanonicalRule {
    pub rule_code: String,
    pub description: Option<String>,
    pub priority: i64,
    pub enabled: bool,
    pub conditions: Vec<CanonicalCondition>,
}

/// Result of a successful validation pass: the usable rules plus any
/// contradictions detected (both tiers are reported here; blocking-tier
/// entries are additionally excluded from `rules`... no — see
/// [`ValidationOutput::usable_rules`]).
#[derive(Debug, Default)]
pub struct ValidationOutput {
    /// All rules that passed structural validation, canonicalized.
    /// Includes rules with warning-tier contradictions (they are kept
    /// per §4.1) but excludes rules with blocking-tier contradictions.
    pub rules: Vec<CanonicalRule>,
    pub contradictions: Vec<ContradictoryRule>,
}

/// Canonicalize a field name: uppercase, `-` -> `_`.
pub fn canonicalize_field(field: &str) -> String {
    field.to_uppercase().replace('-', "_")
}

/// Operators whose string-valued operands participate in
/// case-insensitive equality/containment and are therefore uppercased
/// at canonicalization time. `REGEX` is deliberately excluded.
fn uppercases_value(op: Operator) -> bool {
    matches!(
        op,
        Operator::EqualTo
            | Operator::NotEqualTo
            | Operator::IsAnyOf
            | Operator::IsNoneOf
            | Operator::Contains
            | Operator::StartsWith
            | Operator::EndsWith
    )
}

pub fn validate(input: Vec<RuleDefinition>) -> Result<ValidationOutput, CompilationError> {
    check_duplicate_codes(&input)?;

    let mut output = ValidationOutput::default();
    for rule in input {
        if rule.rule_code.trim().is_empty() {
            return Err(CompilationError::InvalidRule {
                rule_code: rule.rule_code,
                condition_index: 0,
                reason: "rule_code must not be empty".to_string(),
            });
        }

        let mut canonical_conditions = Vec::with_capacity(rule.conditions.len());
        for (index, condition) in rule.conditions.iter().enumerate() {
            let canonical = canonicalize_condition(&rule.rule_code, index, condition)?;
            canonical_conditions.push(canonical);
        }

        let (blocked, reasons) = detect_contradictions(&rule.rule_code, &canonical_conditions);
        for reason in &reasons {
            warn!(rule_code = %rule.rule_code, reason = %reason, "contradiction detected");
            output.contradictions.push(ContradictoryRule {
                rule_code: rule.rule_code.clone(),
                reason: reason.clone(),
            });
        }

        if blocked {
            continue;
        }

        output.rules.push(CanonicalRule {
            rule_code: rule.rule_code,
            description: rule.description,
            priority: rule.priority,
            enabled: rule.enabled,
            conditions: canonical_conditions,
        });
    }

    Ok(output)
}

fn check_duplicate_codes(input: &[RuleDefinition]) -> Result<(), CompilationError> {
    let mut seen = HashSet::with_capacity(input.len());
    for rule in input {
        if !seen.insert(rule.rule_code.clone()) {
            return Err(CompilationError::DuplicateRuleCode(rule.rule_code.clone()));
        }
    }
    Ok(())
}

fn canonicalize_condition(
    rule_code: &str,
    index: usize,
    condition: &Condition,
) -> Result<CanonicalCondition, CompilationError> {
    let invalid = |reason: &str| CompilationError::InvalidRule {
        rule_code: rule_code.to_string(),
        condition_index: index,
        reason: reason.to_string(),
    };

    if condition.field.trim().is_empty() {
        return Err(invalid("field must not be empty"));
    }
    if condition.operator.trim().is_empty() {
        return Err(invalid("operator must not be empty"));
    }

    let operator = Operator::from_str(&condition.operator)
        .map_err(CompilationError::UnsupportedOperator)?;

    if operator.requires_value() && condition.value.is_none() {
        return Err(invalid(&format!("{operator} requires a value")));
    }

    let value = match &condition.value {
        None => None,
        Some(v) => Some(check_value_shape(rule_code, index, operator, v.clone())?),
    };

    let value = value.map(|v| {
        if uppercases_value(operator) {
            v.canonicalize_case()
        } else {
            v
        }
    });

    Ok(CanonicalCondition {
        field: canonicalize_field(&condition.field),
        operator,
        value,
    })
}

fn check_value_shape(
    rule_code: &str,
    index: usize,
    operator: Operator,
    value: ConditionValue,
) -> Result<ConditionValue, CompilationError> {
    let invalid = |reason: String| CompilationError::InvalidRule {
        rule_code: rule_code.to_string(),
        condition_index: index,
        reason,
    };

    match operator {
        Operator::IsAnyOf | Operator::IsNoneOf => match &value {
            ConditionValue::List(items) if !items.is_empty() => Ok(value),
            ConditionValue::List(_) => Err(invalid(format!("{operator} requires a non-empty list"))),
            _ => Err(invalid(format!("{operator} requires a list value"))),
        },
        Operator::Between => match &value {
            ConditionValue::List(items) if items.len() == 2 => {
                if !items[0].is_numeric() || !items[1].is_numeric() {
                    return Err(invalid("BETWEEN bounds must be numeric".to_string()));
                }
                Ok(value)
            }
            ConditionValue::List(items) => Err(invalid(format!(
                "BETWEEN requires exactly 2 values, got {}",
                items.len()
            ))),
            _ => Err(invalid("BETWEEN requires a list value".to_string())),
        },
        Operator::GreaterThan
        | Operator::GreaterThanOrEqual
        | Operator::LessThan
        | Operator::LessThanOrEqual => {
            if value.is_numeric() {
                Ok(value)
            } else {
                Err(invalid(format!(
                    "{operator} requires a numeric value, got {}",
                    value.type_name()
                )))
            }
        }
        Operator::Regex => match value.as_str() {
            Some(pattern) => {
                regex::Regex::new(pattern).map_err(|source| CompilationError::RegexSyntax {
                    rule_code: rule_code.to_string(),
                    source,
                })?;
                Ok(value)
            }
            None => Err(invalid("REGEX requires a string value".to_string())),
        },
        _ => Ok(value),
    }
}

/// Per-field contradiction accumulator for a single rule.
#[derive(Default)]
struct FieldAccumulator {
    equal_values: Vec<ConditionValue>,
    any_of_sets: Vec<Vec<ConditionValue>>,
    max_gt: Option<f64>,
    max_gte: Option<f64>,
    min_lt: Option<f64>,
    min_lte: Option<f64>,
}

/// Returns `(excluded_from_combination_generation, warning_reasons)`.
fn detect_contradictions(_rule_code: &str, conditions: &[CanonicalCondition]) -> (bool, Vec<String>) {
    let mut by_field: HashMap<&str, FieldAccumulator> = HashMap::new();

    for condition in conditions {
        let acc = by_field.entry(condition.field.as_str()).or_default();
        match (condition.operator, &condition.value) {
            (Operator::EqualTo, Some(v)) => {
                if !acc.equal_values.contains(v) {
                    acc.equal_values.push(v.clone());
                }
            }
            (Operator::IsAnyOf, Some(ConditionValue::List(items))) => {
                acc.any_of_sets.push(items.clone());
            }
            (Operator::GreaterThan, Some(v)) => {
                let f = v.as_f64().unwrap_or(f64::NEG_INFINITY);
                acc.max_gt = Some(acc.max_gt.map_or(f, |cur| cur.max(f)));
            }
            (Operator::GreaterThanOrEqual, Some(v)) => {
                let f = v.as_f64().unwrap_or(f64::NEG_INFINITY);
                acc.max_gte = Some(acc.max_gte.map_or(f, |cur| cur.max(f)));
            }
            (Operator::LessThan, Some(v)) => {
                let f = v.as_f64().unwrap_or(f64::INFINITY);
                acc.min_lt = Some(acc.min_lt.map_or(f, |cur| cur.min(f)));
            }
            (Operator::LessThanOrEqual, Some(v)) => {
                let f = v.as_f64().unwrap_or(f64::INFINITY);
                acc.min_lte = Some(acc.min_lte.map_or(f, |cur| cur.min(f)));
            }
            _ => {}
        }
    }

    let mut blocked = false;
    let mut reasons = Vec::new();

    for (field, acc) in &by_field {
        // Warning tier.
        if acc.equal_values.len() > 1 {
            reasons.push(format!(
                "field '{field}' has {} conflicting EQUAL_TO values",
                acc.equal_values.len()
            ));
        }
        if acc.any_of_sets.len() > 1 && intersection_is_empty(&acc.any_of_sets) {
            reasons.push(format!(
                "field '{field}' has IS_ANY_OF sets with empty intersection"
            ));
        }

        // Blocking tier: provably empty numeric range.
        let lower = combine_lower(acc.max_gt, acc.max_gte);
        let upper = combine_upper(acc.min_lt, acc.min_lte);
        if range_is_empty(lower, upper) {
            reasons.push(format!("field '{field}' has a provably empty numeric range"));
            blocked = true;
        }
    }

    // Blocking tier: BETWEEN with min > max, checked per-condition.
    for condition in conditions {
        if condition.operator == Operator::Between {
            if let Some(ConditionValue::List(items)) = &condition.value {
                if let (Some(min), Some(max)) = (items[0].as_f64(), items[1].as_f64()) {
                    if min > max {
                        reasons.push(format!(
                            "field '{}' has BETWEEN with min ({min}) > max ({max})",
                            condition.field
                        ));
                        blocked = true;
                    }
                }
            }
        }
    }

    (blocked, reasons)
}

fn intersection_is_empty(sets: &[Vec<ConditionValue>]) -> bool {
    let mut iter = sets.iter();
    let Some(first) = iter.next() else { return false };
    let mut acc: HashSet<String> = first.iter().map(ConditionValue::dictionary_key).collect();
    for set in iter {
        let keys: HashSet<String> = set.iter().map(ConditionValue::dictionary_key).collect();
        acc = acc.intersection(&keys).cloned().collect();
        if acc.is_empty() {
            return true;
        }
    }
    acc.is_empty()
}

fn combine_lower(max_gt: Option<f64>, max_gte: Option<f64>) -> Option<(f64, bool)> {
    match (max_gt, max_gte) {
        (Some(g), Some(ge)) => Some(if g >= ge { (g, true) } else { (ge, false) }),
        (Some(g), None) => Some((g, true)),
        (None, Some(ge)) => Some((ge, false)),
        (None, None) => None,
    }
}

fn combine_upper(min_lt: Option<f64>, min_lte: Option<f64>) -> Option<(f64, bool)> {
    match (min_lt, min_lte) {
        (Some(l), Some(le)) => Some(if l <= le { (l, true) } else { (le, false) }),
        (Some(l), None) => Some((l, true)),
        (None, Some(le)) => Some((le, false)),
        (None, None) => None,
    }
}

/// `strict` means the bound is an exclusive (`>` / `<`) constraint.
fn range_is_empty(lower: Option<(f64, bool)>, upper: Option<(f64, bool)>) -> bool {
    match (lower, upper) {
        (Some((lv, lstrict)), Some((uv, ustrict))) => {
            if lv > uv {
                true
            } else if (lv - uv).abs() < f64::EPSILON {
                lstrict || ustrict
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::parse_rule_source;

    fn rules(src: &str) -> Vec<RuleDefinition> {
        parse_rule_source(src).unwrap()
    }

    #[test]
    fn canonicalizes_field_name_and_string_value() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "country-code", "operator": "EQUAL_TO", "value": "us"}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        let cond = &out.rules[0].conditions[0];
        assert_eq!(cond.field, "COUNTRY_CODE");
        assert_eq!(cond.value, Some(ConditionValue::Str("US".to_string())));
    }

    #[test]
    fn regex_pattern_is_preserved_verbatim() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "email", "operator": "REGEX", "value": "^[a-z]+@Example\\.com$"}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        assert_eq!(
            out.rules[0].conditions[0].value,
            Some(ConditionValue::Str("^[a-z]+@Example\\.com$".to_string()))
        );
    }

    #[test]
    fn empty_conditions_list_is_accepted() {
        let input = rules(r#"[{"rule_code": "R1", "conditions": []}]"#);
        let out = validate(input).unwrap();
        assert_eq!(out.rules.len(), 1);
    }

    #[test]
    fn duplicate_rule_code_is_rejected() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": []}, {"rule_code": "R1", "conditions": []}]"#,
        );
        let err = validate(input).unwrap_err();
        assert!(matches!(err, CompilationError::DuplicateRuleCode(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "FUZZY_MATCH", "value": 1}
            ]}]"#,
        );
        let err = validate(input).unwrap_err();
        assert!(matches!(err, CompilationError::UnsupportedOperator(_)));
    }

    #[test]
    fn is_any_of_with_empty_list_is_rejected() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "IS_ANY_OF", "value": []}
            ]}]"#,
        );
        let err = validate(input).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidRule { .. }));
    }

    #[test]
    fn between_with_wrong_list_size_is_rejected() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "age", "operator": "BETWEEN", "value": [1, 2, 3]}
            ]}]"#,
        );
        let err = validate(input).unwrap_err();
        assert!(matches!(err, CompilationError::InvalidRule { .. }));
    }

    #[test]
    fn invalid_regex_syntax_is_rejected() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "REGEX", "value": "("}
            ]}]"#,
        );
        let err = validate(input).unwrap_err();
        assert!(matches!(err, CompilationError::RegexSyntax { .. }));
    }

    #[test]
    fn between_min_greater_than_max_is_blocked_with_warning() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "age", "operator": "BETWEEN", "value": [65, 18]}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        assert!(out.rules.is_empty());
        assert_eq!(out.contradictions.len(), 1);
    }

    #[test]
    fn contradictory_numeric_range_across_conditions_is_blocked() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "GREATER_THAN", "value": 100},
                {"field": "x", "operator": "LESS_THAN", "value": 50}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        assert!(out.rules.is_empty());
        assert!(out.contradictions.iter().any(|c| c.rule_code == "R1"));
    }

    #[test]
    fn equal_bounds_with_both_inclusive_is_not_empty() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "GREATER_THAN_OR_EQUAL", "value": 5},
                {"field": "x", "operator": "LESS_THAN_OR_EQUAL", "value": 5}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        assert_eq!(out.rules.len(), 1);
    }

    #[test]
    fn conflicting_equal_to_values_is_warning_only_and_keeps_rule() {
        let input = rules(
            r#"[{"rule_code": "R1", "conditions": [
                {"field": "x", "operator": "EQUAL_TO", "value": "A"},
                {"field": "x", "operator": "EQUAL_TO", "value": "B"}
            ]}]"#,
        );
        let out = validate(input).unwrap();
        assert_eq!(out.rules.len(), 1, "warning-tier contradiction keeps the rule");
        assert_eq!(out.contradictions.len(), 1);
    }
}
