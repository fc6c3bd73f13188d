//! # Matching engine (§4.5)
//!
//! `MatchingEngine` wraps a [`ModelHandle`] and a pool of reusable
//! [`EvaluationContext`]s behind a `parking_lot::Mutex`, grounded on the
//! teacher's `incremental` module, which pools `Arc<Mutex<EvaluationState>>`
//! scratch buffers across incremental-update calls rather than allocate
//! one per call. Matching follows the same shape here: checking out a
//! context, running the counting algorithm, and returning it.
//!
//! ## The counting algorithm
//!
//! 1. Load the current model (one atomic pointer read).
//! 2. For every attribute on the event, dispatch to the evaluator for
//!    that attribute's value kind, which marks each predicate that
//!    holds true by incrementing a per-combination counter for every
//!    combination the inverted index says requires that predicate.
//! 3. For every field carrying a null-check predicate that the event's
//!    attributes never visited, run the null evaluator once more with
//!    `present = false`.
//! 4. A combination is satisfied when its counter equals its required
//!    predicate count; combinations with zero required predicates
//!    (rules authored with an empty condition list) are always
//!    satisfied regardless of the event.
//! 5. Collect the logical rules of every satisfied combination, sort by
//!    descending priority (ties broken by ascending `rule_code`), and
//!    apply the requested [`SelectionStrategy`].

use crate::error::EvaluationError;
use crate::evaluators::{equality, null_ops, range, string_ops};
use crate::metrics::Metrics;
use crate::model::{EngineModel, ModelHandle, RuleRef};
use crate::trace::{PredicateOutcome, Trace, TraceLevel};
use crate::value::ConditionValue;
use parking_lot::Mutex;
use roaring::RoaringBitmap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// A single inbound event: an opaque id plus a flat attribute map.
/// Attribute names are matched against field names exactly as they were
/// authored in rules (case is normalized downstream by the dictionary).
#[derive(Debug, Clone)]
pub struct Event {
    pub event_id: String,
    pub attributes: HashMap<String, ConditionValue>,
}

impl Event {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, field: impl Into<String>, value: ConditionValue) -> Self {
        self.attributes.insert(field.into(), value);
        self
    }
}

/// Whether `match_event` returns every satisfied rule or stops at the
/// first (highest-priority) one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    #[default]
    AllMatches,
    FirstMatch,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedRule {
    pub rule_code: String,
    pub priority: i64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub matched_rules: Vec<MatchedRule>,
    pub evaluation_time_ns: u64,
    pub predicates_evaluated: usize,
    /// Distinct combinations whose true-predicate counter was inspected
    /// this call (touched combinations plus always-true ones) — the
    /// "combination-evaluation count" §4.5 describes, reported under
    /// this name to match the wire shape in §6.
    pub rules_evaluated: usize,
    pub trace: Option<Trace>,
    /// Per-event evaluation errors (e.g. a non-numeric value on a field
    /// that carries a numeric predicate). Isolated to this call — they
    /// never abort matching, and the field is simply skipped for the
    /// mismatched evaluator (see §7).
    pub errors: Vec<EvaluationError>,
}

/// Per-call tuning: an optional predicate eligibility filter (restricts
/// which predicates evaluators are allowed to mark true, e.g. for
/// partial re-evaluation), the trace verbosity, and the selection
/// strategy.
#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    pub eligibility: Option<RoaringBitmap>,
    pub trace_level: TraceLevel,
    pub strategy: SelectionStrategy,
}

/// Reusable scratch space for one `match_event` call. Sized to the
/// model's combination count and cleared in O(touched) via a
/// generation tag rather than a full O(M) sweep per call.
pub struct EvaluationContext {
    true_counts: Vec<u32>,
    generation_marks: Vec<u64>,
    generation: u64,
    touched: Vec<u32>,
    visited_fields: HashSet<u32>,
    predicates_evaluated: usize,
    trace_level: TraceLevel,
    trace: Option<Trace>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self {
            true_counts: Vec::new(),
            generation_marks: Vec::new(),
            generation: 0,
            touched: Vec::new(),
            visited_fields: HashSet::new(),
            predicates_evaluated: 0,
            trace_level: TraceLevel::None,
            trace: None,
        }
    }

    fn begin(&mut self, model: &EngineModel, trace_level: TraceLevel) {
        let combinations = model.combination_count();
        if self.true_counts.len() < combinations {
            self.true_counts.resize(combinations, 0);
            self.generation_marks.resize(combinations, 0);
        }
        self.generation += 1;
        self.touched.clear();
        self.visited_fields.clear();
        self.predicates_evaluated = 0;
        self.trace_level = trace_level;
        self.trace = if trace_level > TraceLevel::None { Some(Trace::default()) } else { None };
    }

    pub(crate) fn increment(&mut self, combination_id: u32) {
        let idx = combination_id as usize;
        if self.generation_marks[idx] != self.generation {
            self.generation_marks[idx] = self.generation;
            self.true_counts[idx] = 0;
            self.touched.push(combination_id);
        }
        self.true_counts[idx] += 1;
    }

    fn count(&self, combination_id: u32) -> u32 {
        let idx = combination_id as usize;
        if self.generation_marks[idx] == self.generation {
            self.true_counts[idx]
        } else {
            0
        }
    }

    pub(crate) fn record_predicate_evaluated(&mut self) {
        self.predicates_evaluated += 1;
    }

    pub(crate) fn wants_value_trace(&self) -> bool {
        self.trace_level.captures_values()
    }

    pub(crate) fn trace_predicate(
        &mut self,
        model: &EngineModel,
        field_id: u32,
        predicate_id: u32,
        passed: bool,
        actual: Option<String>,
    ) {
        if !self.trace_level.captures_predicates() {
            return;
        }
        let expected = if self.trace_level.captures_values() {
            Some(format!("{:?}", model.predicate(predicate_id).key.value))
        } else {
            None
        };
        let actual = if self.trace_level.captures_values() { actual } else { None };
        if let Some(trace) = self.trace.as_mut() {
            trace.record_predicate(PredicateOutcome {
                predicate_id,
                field_id,
                passed,
                expected,
                actual,
            });
        }
    }

    fn mark_visited(&mut self, field_id: u32) {
        self.visited_fields.insert(field_id);
    }

    fn visited(&self, field_id: u32) -> bool {
        self.visited_fields.contains(&field_id)
    }
}

/// Holds the live [`ModelHandle`] plus a pool of [`EvaluationContext`]s
/// reused across calls, and a running [`Metrics`] snapshot.
pub struct MatchingEngine {
    model: ModelHandle,
    pool: Mutex<Vec<EvaluationContext>>,
    metrics: Metrics,
}

impl MatchingEngine {
    pub fn new(model: EngineModel) -> Self {
        Self {
            model: ModelHandle::new(model),
            pool: Mutex::new(Vec::new()),
            metrics: Metrics::new(),
        }
    }

    pub fn model_handle(&self) -> &ModelHandle {
        &self.model
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn checkout(&self) -> EvaluationContext {
        self.pool.lock().pop().unwrap_or_default()
    }

    fn checkin(&self, ctx: EvaluationContext) {
        self.pool.lock().push(ctx);
    }

    pub fn match_event(&self, event: &Event, options: &MatchOptions) -> MatchResult {
        let model = self.model.load();
        let started = Instant::now();
        let mut ctx = self.checkout();
        ctx.begin(&model, options.trace_level);

        let mut errors: Vec<EvaluationError> = Vec::new();
        for (field, value) in &event.attributes {
            let field_id = model.field_id(field);
            if field_id == crate::dictionary::UNKNOWN_ID {
                continue;
            }
            ctx.mark_visited(field_id);
            if model.range_index_for(field_id).is_some() && value.as_f64().is_none() {
                errors.push(EvaluationError::TypeMismatch {
                    field: field.clone(),
                    value_type: value.type_name().to_string(),
                });
            }
            evaluate_field(&model, field_id, value, &mut ctx, options.eligibility.as_ref());
        }

        for field_id in model.fields_with_null_predicates().collect::<Vec<_>>() {
            if !ctx.visited(field_id) {
                null_ops::evaluate(&model, field_id, false, &mut ctx, options.eligibility.as_ref());
            }
        }
        for field_id in model.fields_with_none_of_predicates().collect::<Vec<_>>() {
            if !ctx.visited(field_id) {
                equality::evaluate_absent(&model, field_id, &mut ctx, options.eligibility.as_ref());
            }
        }

        let elapsed = started.elapsed();
        let predicates_evaluated = ctx.predicates_evaluated;

        let mut satisfied: Vec<u32> = ctx
            .touched
            .iter()
            .copied()
            .filter(|&id| ctx.count(id) == model.predicate_count_for(id))
            .collect();
        satisfied.extend_from_slice(model.always_match_combinations());
        let combinations_evaluated = satisfied.len();

        let mut by_rule: HashMap<&str, &RuleRef> = HashMap::new();
        for &combination_id in &satisfied {
            for rule_ref in model.rules_for(combination_id) {
                by_rule
                    .entry(rule_ref.rule_code.as_str())
                    .and_modify(|existing| {
                        if rule_ref.priority > existing.priority {
                            *existing = rule_ref;
                        }
                    })
                    .or_insert(rule_ref);
            }
        }

        let mut matched_rules: Vec<MatchedRule> = by_rule
            .into_values()
            .map(|r| MatchedRule {
                rule_code: r.rule_code.clone(),
                priority: r.priority,
                description: r.description.clone(),
            })
            .collect();
        matched_rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.rule_code.cmp(&b.rule_code)));

        if options.strategy == SelectionStrategy::FirstMatch {
            matched_rules.truncate(1);
        }

        let trace = ctx.trace.take();
        self.metrics.record_match(elapsed, matched_rules.len(), predicates_evaluated);
        self.checkin(ctx);

        tracing::debug!(
            event_id = %event.event_id,
            matched = matched_rules.len(),
            predicates_evaluated,
            evaluation_time_ns = elapsed.as_nanos() as u64,
            "match_event complete"
        );

        MatchResult {
            matched_rules,
            evaluation_time_ns: elapsed.as_nanos() as u64,
            predicates_evaluated,
            rules_evaluated: combinations_evaluated,
            errors,
            trace,
        }
    }

    /// Evaluate a single rule against a single event at `TraceLevel::Full`
    /// regardless of the caller's usual trace setting, for diagnosing why
    /// a rule did or did not fire. Returns `None` if `rule_code` is
    /// unknown to the current model.
    pub fn explain(&self, rule_code: &str, event: &Event) -> Option<MatchResult> {
        let model = self.model.load();
        if model.combinations_for_rule(rule_code).is_empty() {
            return None;
        }
        let options = MatchOptions {
            eligibility: None,
            trace_level: TraceLevel::Full,
            strategy: SelectionStrategy::AllMatches,
        };
        let mut result = self.match_event(event, &options);
        result.matched_rules.retain(|r| r.rule_code == rule_code);
        Some(result)
    }
}

fn evaluate_field(
    model: &EngineModel,
    field_id: u32,
    value: &ConditionValue,
    ctx: &mut EvaluationContext,
    eligibility: Option<&RoaringBitmap>,
) {
    if let Some(numeric) = value.as_f64() {
        range::evaluate(model, field_id, numeric, ctx, eligibility);
    }
    if let Some(s) = value.as_str() {
        let uppercased = s.to_uppercase();
        string_ops::evaluate(model, field_id, &uppercased, ctx, eligibility);
    }
    // A list-valued attribute has no single dictionary key of its own.
    // Equality/NOT_EQUAL_TO/IS_NONE_OF predicates compare against one
    // encoded value, and evaluating them once per list element would
    // double-count a NOT_EQUAL_TO/IS_NONE_OF predicate that more than
    // one element satisfies, so list values skip equality dispatch
    // rather than guess at multi-value semantics; range and string
    // dispatch above already no-op for a list since `as_f64`/`as_str`
    // return `None` for it.
    if !matches!(value, ConditionValue::List(_)) {
        let encoded = model.value_id(&value.dictionary_key());
        equality::evaluate(model, field_id, encoded, ctx, eligibility);
    }
    null_ops::evaluate(model, field_id, true, ctx, eligibility);
}
