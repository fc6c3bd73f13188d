//! # EngineModel Builder (§4.4)
//!
//! Turns the fully expanded [`RuleCombination`]s into the frozen
//! [`EngineModel`]: interns predicates and combinations, builds the
//! inverted index and per-field predicate lists, and derives the
//! logical-rule maps and stats §4.4's "Finalization" step names.
//!
//! Grounded on the teacher's `ir_builder` module: a single-pass builder
//! struct that owns interning maps during construction and produces an
//! immutable downstream artifact (there, `IRNode`s; here, `EngineModel`).

use crate::dictionary::Dictionary;
use crate::error::CompilationError;
use crate::evaluators::build_field_indices;
use crate::expander::RuleCombination;
use crate::index::InvertedIndex;
use crate::model::{compilation_stats, EngineModel, RuleRef};
use crate::operator::Operator;
use crate::predicate::{Number, Predicate, PredicateKey, PredicateValue};
use crate::selectivity::SelectivityProfile;
use crate::validator::{CanonicalCondition, CanonicalRule};
use crate::value::ConditionValue;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Pre-encode every field name referenced by `rules` into a dictionary
/// and fold the same rules into a [`SelectivityProfile`]. Runs over the
/// validated rules directly, before factorization or expansion, so that
/// incidence is measured against logical rules rather than expanded
/// combinations (§4.3 defines selectivity per-field, per-rule-set).
pub fn profile_fields(rules: &[CanonicalRule]) -> (Dictionary, SelectivityProfile) {
    let mut field_dictionary = Dictionary::new();
    let mut profile = SelectivityProfile::new();

    for rule in rules {
        profile.record_rule();
        let mut seen: HashSet<u32> = HashSet::new();
        for condition in &rule.conditions {
            let field_id = field_dictionary.encode(&condition.field);
            if seen.insert(field_id) {
                profile.record_field_reference(field_id);
            }
        }
    }

    (field_dictionary, profile)
}

/// Owns the interning maps for a single compilation pass. Dropped once
/// [`EngineModelBuilder::freeze`] produces the immutable [`EngineModel`].
pub struct EngineModelBuilder {
    field_dictionary: Dictionary,
    value_dictionary: Dictionary,
    predicate_keys: HashMap<PredicateKey, u32>,
    predicates: Vec<Predicate>,
    combination_keys: HashMap<Vec<u32>, u32>,
    combination_predicates: Vec<Vec<u32>>,
    combination_rules: Vec<Vec<RuleRef>>,
    rule_combinations: HashMap<String, Vec<u32>>,
    predicate_references: usize,
}

impl EngineModelBuilder {
    pub fn new(field_dictionary: Dictionary, value_dictionary: Dictionary) -> Self {
        Self {
            field_dictionary,
            value_dictionary,
            predicate_keys: HashMap::new(),
            predicates: Vec::new(),
            combination_keys: HashMap::new(),
            combination_predicates: Vec::new(),
            combination_rules: Vec::new(),
            rule_combinations: HashMap::new(),
            predicate_references: 0,
        }
    }

    /// Intern every combination produced by expansion, registering its
    /// predicates and folding its rule mapping into `rule_combinations` /
    /// `combination_rules`.
    pub fn register(
        &mut self,
        combinations: Vec<RuleCombination>,
        selectivity: &SelectivityProfile,
    ) -> Result<(), CompilationError> {
        for combo in combinations {
            let mut predicate_ids: Vec<u32> = Vec::with_capacity(combo.conditions.len());
            for (condition, any_of_len) in combo.conditions.iter().zip(&combo.any_of_list_lens) {
                let id = self.intern_predicate(condition, *any_of_len, selectivity)?;
                predicate_ids.push(id);
            }
            predicate_ids.sort_unstable();
            predicate_ids.dedup();
            self.predicate_references += predicate_ids.len();

            let combination_id = match self.combination_keys.get(&predicate_ids) {
                Some(&id) => id,
                None => {
                    let id = self.combination_predicates.len() as u32;
                    self.combination_predicates.push(predicate_ids.clone());
                    self.combination_rules.push(Vec::new());
                    self.combination_keys.insert(predicate_ids.clone(), id);
                    id
                }
            };

            let rule_ref = RuleRef {
                rule_code: combo.rule_code.clone(),
                priority: combo.priority,
                description: combo.description.clone(),
            };
            let existing = self.combination_rules[combination_id as usize]
                .iter_mut()
                .find(|r: &&mut RuleRef| r.rule_code == rule_ref.rule_code);
            match existing {
                Some(existing) => existing.priority = existing.priority.max(rule_ref.priority),
                None => self.combination_rules[combination_id as usize].push(rule_ref),
            }

            self.rule_combinations
                .entry(combo.rule_code)
                .or_default()
                .push(combination_id);
        }
        Ok(())
    }

    fn intern_predicate(
        &mut self,
        condition: &CanonicalCondition,
        any_of_len: Option<usize>,
        selectivity: &SelectivityProfile,
    ) -> Result<u32, CompilationError> {
        let field_id = self.field_dictionary.encode(&condition.field);
        let (value, compiled_pattern) =
            build_predicate_value(&mut self.value_dictionary, condition)?;

        let key = PredicateKey {
            field_id,
            operator: condition.operator,
            value,
        };

        if let Some(&id) = self.predicate_keys.get(&key) {
            return Ok(id);
        }

        // Selectivity is computed against the condition's *logical*
        // operator: an IS_ANY_OF branch is rewritten to EQUAL_TO for
        // evaluation, but its selectivity still reflects the original
        // list length per §4.3's operator factor table.
        let (factor_operator, list_len) = match any_of_len {
            Some(len) => (Operator::IsAnyOf, len),
            None => (condition.operator, list_len_of(condition)),
        };
        let sel = selectivity.selectivity(field_id, factor_operator, list_len);
        let weight = selectivity.weight(sel, factor_operator);

        let id = self.predicates.len() as u32;
        self.predicates.push(Predicate {
            id,
            key: key.clone(),
            compiled_pattern,
            weight,
            selectivity: sel,
        });
        self.predicate_keys.insert(key, id);
        Ok(id)
    }

    /// Build per-field predicate lists (ascending by weight), the
    /// inverted index, per-field minimum weight, and final stats,
    /// producing the immutable [`EngineModel`].
    pub fn freeze(self, started_at: Instant) -> EngineModel {
        let Self {
            field_dictionary,
            value_dictionary,
            predicates,
            combination_predicates,
            combination_rules,
            rule_combinations,
            predicate_references,
            ..
        } = self;

        let mut fields: HashMap<u32, Vec<u32>> = HashMap::new();
        for predicate in &predicates {
            fields.entry(predicate.field_id()).or_default().push(predicate.id);
        }
        for ids in fields.values_mut() {
            ids.sort_by(|&a, &b| {
                predicates[a as usize]
                    .weight
                    .partial_cmp(&predicates[b as usize].weight)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }

        let field_min_weight: HashMap<u32, f64> = fields
            .iter()
            .map(|(&field_id, ids)| {
                let min = ids
                    .iter()
                    .map(|&id| predicates[id as usize].weight)
                    .fold(f64::INFINITY, f64::min);
                (field_id, min)
            })
            .collect();

        let mut index = InvertedIndex::new();
        let predicate_counts: Vec<u32> = combination_predicates
            .iter()
            .map(|ids| ids.len() as u32)
            .collect();
        for (combination_id, ids) in combination_predicates.iter().enumerate() {
            for &predicate_id in ids {
                index.insert(predicate_id, combination_id as u32);
            }
        }

        let always_match: Vec<u32> = predicate_counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count == 0)
            .map(|(id, _)| id as u32)
            .collect();

        for (rule_code, combos) in &rule_combinations {
            if combos.is_empty() {
                warn!(rule_code = %rule_code, "rule produced zero combinations after expansion");
            }
        }

        let stats = compilation_stats(
            combination_predicates.len(),
            predicates.len(),
            started_at.elapsed(),
            predicate_references,
            rule_combinations.len(),
        );

        let field_indices = build_field_indices(&predicates);

        EngineModel {
            field_dictionary,
            value_dictionary,
            predicates,
            fields,
            combination_predicates,
            predicate_counts,
            combination_rules,
            rule_combinations,
            index,
            field_min_weight,
            equality_index: field_indices.equality,
            range_index: field_indices.range,
            string_index: field_indices.string_ops,
            null_index: field_indices.null_ops,
            always_match,
            stats,
        }
    }
}

fn list_len_of(condition: &CanonicalCondition) -> usize {
    match &condition.value {
        Some(ConditionValue::List(items)) => items.len(),
        _ => 0,
    }
}

fn to_number(value: &ConditionValue) -> Number {
    match value {
        ConditionValue::Integer(i) => Number::Int(*i),
        ConditionValue::Float(f) => Number::Float(*f),
        other => Number::Float(other.as_f64().unwrap_or(0.0)),
    }
}

/// Build the operator-specific [`PredicateValue`] (and compiled regex,
/// where applicable) for a canonicalized condition. The validator has
/// already guaranteed shape (list sizes, numeric-ness, regex syntax), so
/// this only encodes — it never rejects.
fn build_predicate_value(
    value_dictionary: &mut Dictionary,
    condition: &CanonicalCondition,
) -> Result<(PredicateValue, Option<Arc<Regex>>), CompilationError> {
    match condition.operator {
        Operator::EqualTo => {
            let v = condition.value.as_ref().expect("validator requires a value");
            Ok((PredicateValue::Equal(value_dictionary.encode(&v.dictionary_key())), None))
        }
        Operator::NotEqualTo => {
            let v = condition.value.as_ref().expect("validator requires a value");
            Ok((PredicateValue::NotEqual(value_dictionary.encode(&v.dictionary_key())), None))
        }
        Operator::IsNoneOf => {
            let items = condition
                .value
                .as_ref()
                .and_then(ConditionValue::as_list)
                .expect("validator requires a non-empty list");
            let mut ids: Vec<u32> = items
                .iter()
                .map(|v| value_dictionary.encode(&v.dictionary_key()))
                .collect();
            ids.sort_unstable();
            ids.dedup();
            Ok((PredicateValue::NoneOf(ids), None))
        }
        Operator::GreaterThan
        | Operator::GreaterThanOrEqual
        | Operator::LessThan
        | Operator::LessThanOrEqual => {
            let v = condition.value.as_ref().expect("validator requires a value");
            Ok((PredicateValue::Numeric(to_number(v)), None))
        }
        Operator::Between => {
            let items = condition
                .value
                .as_ref()
                .and_then(ConditionValue::as_list)
                .expect("validator requires a 2-element list");
            Ok((
                PredicateValue::Between(to_number(&items[0]), to_number(&items[1])),
                None,
            ))
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            let v = condition.value.as_ref().expect("validator requires a value");
            let s = v.as_str().expect("validator requires a string value").to_string();
            Ok((PredicateValue::Str(s), None))
        }
        Operator::Regex => {
            let v = condition.value.as_ref().expect("validator requires a value");
            let pattern = v.as_str().expect("validator requires a string value").to_string();
            let compiled = Regex::new(&pattern).map_err(|source| CompilationError::RegexSyntax {
                rule_code: String::new(),
                source,
            })?;
            Ok((PredicateValue::Regex(pattern), Some(Arc::new(compiled))))
        }
        Operator::IsNull | Operator::IsNotNull => Ok((PredicateValue::None, None)),
        Operator::IsAnyOf => Err(CompilationError::ModelBuildError(
            "IS_ANY_OF must be rewritten to EQUAL_TO before interning".to_string(),
        )),
    }
}
