use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::domain::Reason;

/// Metrics registry for the application.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Total evaluations completed
    pub evaluations_total: AtomicU64,

    /// Evaluations by outcome path
    pub outcome_flag_not_found: AtomicU64,
    pub outcome_flag_disabled: AtomicU64,
    pub outcome_rule_matched: AtomicU64,
    pub outcome_full_rollout: AtomicU64,
    pub outcome_in_rollout: AtomicU64,
    pub outcome_outside_rollout: AtomicU64,

    /// Evaluations aborted by a store failure
    pub evaluation_errors: AtomicU64,

    /// Evaluation latency buckets (microseconds)
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,

    /// Administrative writes
    pub admin_writes_total: AtomicU64,
    pub admin_write_errors: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        MetricsRegistry::default()
    }

    /// Record an evaluation outcome.
    pub fn record_outcome(&self, reason: &Reason) {
        self.evaluations_total.fetch_add(1, Ordering::Relaxed);

        let counter = match reason {
            Reason::FlagNotFound => &self.outcome_flag_not_found,
            Reason::FlagDisabled => &self.outcome_flag_disabled,
            Reason::RuleMatched(_) => &self.outcome_rule_matched,
            Reason::FullRollout => &self.outcome_full_rollout,
            Reason::InRollout { .. } => &self.outcome_in_rollout,
            Reason::OutsideRollout { .. } => &self.outcome_outside_rollout,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an evaluation that failed on a store read.
    pub fn record_error(&self) {
        self.evaluation_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record evaluation latency.
    pub fn record_latency(&self, start: Instant) {
        let micros = start.elapsed().as_micros() as u64;

        if micros < 1000 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 5000 {
            self.latency_1_5ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 10000 {
            self.latency_5_10ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 50000 {
            self.latency_10_50ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 100000 {
            self.latency_50_100ms.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_100ms.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an administrative write.
    pub fn record_admin_write(&self, success: bool) {
        self.admin_writes_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.admin_write_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP flagr_evaluations_total Total number of completed evaluations
# TYPE flagr_evaluations_total counter
flagr_evaluations_total {}

# HELP flagr_evaluations Evaluations by outcome
# TYPE flagr_evaluations counter
flagr_evaluations{{outcome="flag_not_found"}} {}
flagr_evaluations{{outcome="flag_disabled"}} {}
flagr_evaluations{{outcome="rule_matched"}} {}
flagr_evaluations{{outcome="full_rollout"}} {}
flagr_evaluations{{outcome="in_rollout"}} {}
flagr_evaluations{{outcome="outside_rollout"}} {}

# HELP flagr_evaluation_errors_total Evaluations aborted by store failures
# TYPE flagr_evaluation_errors_total counter
flagr_evaluation_errors_total {}

# HELP flagr_evaluation_latency_bucket Evaluation latency histogram
# TYPE flagr_evaluation_latency_bucket counter
flagr_evaluation_latency_bucket{{le="0.001"}} {}
flagr_evaluation_latency_bucket{{le="0.005"}} {}
flagr_evaluation_latency_bucket{{le="0.01"}} {}
flagr_evaluation_latency_bucket{{le="0.05"}} {}
flagr_evaluation_latency_bucket{{le="0.1"}} {}
flagr_evaluation_latency_bucket{{le="+Inf"}} {}

# HELP flagr_admin_writes_total Administrative write operations
# TYPE flagr_admin_writes_total counter
flagr_admin_writes_total {}

# HELP flagr_admin_write_errors_total Administrative write errors
# TYPE flagr_admin_write_errors_total counter
flagr_admin_write_errors_total {}
"#,
            self.evaluations_total.load(Ordering::Relaxed),
            self.outcome_flag_not_found.load(Ordering::Relaxed),
            self.outcome_flag_disabled.load(Ordering::Relaxed),
            self.outcome_rule_matched.load(Ordering::Relaxed),
            self.outcome_full_rollout.load(Ordering::Relaxed),
            self.outcome_in_rollout.load(Ordering::Relaxed),
            self.outcome_outside_rollout.load(Ordering::Relaxed),
            self.evaluation_errors.load(Ordering::Relaxed),
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_5ms.load(Ordering::Relaxed),
            self.latency_5_10ms.load(Ordering::Relaxed),
            self.latency_10_50ms.load(Ordering::Relaxed),
            self.latency_50_100ms.load(Ordering::Relaxed),
            self.latency_over_100ms.load(Ordering::Relaxed),
            self.admin_writes_total.load(Ordering::Relaxed),
            self.admin_write_errors.load(Ordering::Relaxed),
        )
    }
}

/// Guard for timing operations.
pub struct TimingGuard<'a> {
    registry: &'a MetricsRegistry,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(registry: &'a MetricsRegistry) -> Self {
        TimingGuard {
            registry,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.registry.record_latency(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcome() {
        let metrics = MetricsRegistry::new();

        metrics.record_outcome(&Reason::FullRollout);
        metrics.record_outcome(&Reason::FullRollout);
        metrics.record_outcome(&Reason::OutsideRollout {
            bucket: 40,
            percentage: 10,
        });

        assert_eq!(metrics.evaluations_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.outcome_full_rollout.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.outcome_outside_rollout.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.outcome_in_rollout.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_timing_guard() {
        let metrics = MetricsRegistry::new();

        {
            let _guard = TimingGuard::new(&metrics);
        }

        assert!(metrics.latency_under_1ms.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = MetricsRegistry::new();
        metrics.record_outcome(&Reason::FlagDisabled);
        metrics.record_admin_write(false);

        let output = metrics.to_prometheus();

        assert!(output.contains("flagr_evaluations_total 1"));
        assert!(output.contains("flagr_evaluations{outcome=\"flag_disabled\"} 1"));
        assert!(output.contains("flagr_admin_write_errors_total 1"));
    }
}
