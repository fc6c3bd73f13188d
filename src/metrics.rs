//! # Runtime metrics (§4.5, §6)
//!
//! Lock-free counters updated on every `match_event` call, exposed as a
//! point-in-time [`MetricsSnapshot`]. Grounded on the teacher's
//! `protocol::rest` rate limiter, which keeps per-request counters in
//! plain `AtomicU64`s rather than behind a mutex.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct Metrics {
    matches_total: AtomicU64,
    events_total: AtomicU64,
    rules_matched_total: AtomicU64,
    predicates_evaluated_total: AtomicU64,
    evaluation_time_ns_total: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub events_total: u64,
    pub matches_total: u64,
    pub rules_matched_total: u64,
    pub predicates_evaluated_total: u64,
    pub mean_evaluation_time_ns: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_match(&self, elapsed: Duration, matched_rule_count: usize, predicates_evaluated: usize) {
        self.events_total.fetch_add(1, Ordering::Relaxed);
        if matched_rule_count > 0 {
            self.matches_total.fetch_add(1, Ordering::Relaxed);
        }
        self.rules_matched_total.fetch_add(matched_rule_count as u64, Ordering::Relaxed);
        self.predicates_evaluated_total
            .fetch_add(predicates_evaluated as u64, Ordering::Relaxed);
        self.evaluation_time_ns_total
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let events_total = self.events_total.load(Ordering::Relaxed);
        let evaluation_time_ns_total = self.evaluation_time_ns_total.load(Ordering::Relaxed);
        let mean_evaluation_time_ns = if events_total == 0 {
            0.0
        } else {
            evaluation_time_ns_total as f64 / events_total as f64
        };
        MetricsSnapshot {
            events_total,
            matches_total: self.matches_total.load(Ordering::Relaxed),
            rules_matched_total: self.rules_matched_total.load(Ordering::Relaxed),
            predicates_evaluated_total: self.predicates_evaluated_total.load(Ordering::Relaxed),
            mean_evaluation_time_ns,
        }
    }
}
