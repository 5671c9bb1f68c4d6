use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{EvalResult, Reason};
use crate::observability::{MetricsRegistry, TimingGuard};
use crate::rules::first_match;
use crate::storage::{FlagStore, RuleStore};

use super::bucket::bucket;
use super::EvaluationError;

/// Decides whether a flag is on for a user.
///
/// Stateless apart from its store handles: every call reads the current
/// flag and its rules, nothing is cached between calls. The two reads are
/// not wrapped in a transaction, so a write landing between them may or
/// may not be observed by that one call.
#[derive(Clone)]
pub struct Evaluator {
    flags: Arc<dyn FlagStore>,
    rules: Arc<dyn RuleStore>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl Evaluator {
    pub fn new(flags: Arc<dyn FlagStore>, rules: Arc<dyn RuleStore>) -> Self {
        Evaluator {
            flags,
            rules,
            metrics: None,
        }
    }

    /// Record outcomes and latency into a metrics registry.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Evaluate `flag_name` for `user_id` with the given attributes.
    ///
    /// Precedence: missing flag, master switch, first matching targeting
    /// rule, full rollout, then bucket comparison. Only store failures
    /// produce an error.
    pub async fn evaluate(
        &self,
        flag_name: &str,
        user_id: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<EvalResult, EvaluationError> {
        let _timing = self.metrics.as_deref().map(TimingGuard::new);

        let result = self.decide(flag_name, user_id, attributes).await;

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(r) => metrics.record_outcome(&r.reason),
                Err(_) => metrics.record_error(),
            }
        }

        match &result {
            Ok(r) => debug!(
                flag = flag_name,
                user_id = user_id,
                enabled = r.enabled,
                reason = %r.reason,
                "Flag evaluated"
            ),
            Err(e) => warn!(flag = flag_name, user_id = user_id, error = %e, "Flag evaluation failed"),
        }

        result
    }

    async fn decide(
        &self,
        flag_name: &str,
        user_id: &str,
        attributes: &HashMap<String, String>,
    ) -> Result<EvalResult, EvaluationError> {
        let Some(flag) = self
            .flags
            .get_by_name(flag_name)
            .await
            .map_err(EvaluationError::FlagStore)?
        else {
            return Ok(EvalResult::off(Reason::FlagNotFound));
        };

        if !flag.enabled {
            return Ok(EvalResult::off(Reason::FlagDisabled));
        }

        let rules = self
            .rules
            .get_by_flag_name(flag_name)
            .await
            .map_err(EvaluationError::RuleStore)?;

        if let Some(rule) = first_match(&rules, attributes) {
            return Ok(EvalResult::on(Reason::RuleMatched(rule.describe())));
        }

        if flag.is_fully_rolled_out() {
            return Ok(EvalResult::on(Reason::FullRollout));
        }

        let bucket = bucket(flag_name, user_id);
        let percentage = flag.rollout_percentage;

        if bucket < percentage {
            Ok(EvalResult::on(Reason::InRollout { bucket, percentage }))
        } else {
            Ok(EvalResult::off(Reason::OutsideRollout { bucket, percentage }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Flag, TargetingRule};
    use crate::storage::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn enabled_flag(name: &str, rollout: u8) -> Flag {
        let mut flag = Flag::new(name, None);
        flag.set_enabled(true);
        flag.set_rollout_percentage(rollout).unwrap();
        flag
    }

    fn evaluator_for(store: &Arc<MemoryStore>) -> Evaluator {
        Evaluator::new(store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_flag_not_found() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = evaluator_for(&store);

        let result = evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap();

        assert!(!result.enabled);
        assert_eq!(result.reason_text(), "flag not found");
    }

    #[tokio::test]
    async fn test_disabled_flag_wins_over_rules_and_rollout() {
        let store = Arc::new(MemoryStore::new());
        let mut flag = Flag::new("beta", None);
        flag.set_rollout_percentage(100).unwrap();
        store.put_flag(flag);
        store.push_rule(TargetingRule::new("beta", "plan", "equals", "gold"));
        let evaluator = evaluator_for(&store);

        for user in ["u1", "u2", "u3"] {
            let result = evaluator
                .evaluate("beta", user, &attrs(&[("plan", "gold")]))
                .await
                .unwrap();
            assert_eq!(result, EvalResult::off(Reason::FlagDisabled));
            assert_eq!(result.reason_text(), "flag disabled");
        }
    }

    #[tokio::test]
    async fn test_full_rollout_without_rules() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 100));
        let evaluator = evaluator_for(&store);

        for i in 0..50 {
            let result = evaluator
                .evaluate("beta", &format!("user-{i}"), &attrs(&[]))
                .await
                .unwrap();
            assert!(result.enabled);
            assert_eq!(result.reason_text(), "rollout 100%");
        }
    }

    #[tokio::test]
    async fn test_targeting_rule_match() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 100));
        store.push_rule(TargetingRule::new("beta", "plan", "equals", "gold"));
        let evaluator = evaluator_for(&store);

        let result = evaluator
            .evaluate("beta", "u1", &attrs(&[("plan", "gold")]))
            .await
            .unwrap();

        assert!(result.enabled);
        assert_eq!(result.reason_text(), "targeting rule matched: plan equals gold");
    }

    #[tokio::test]
    async fn test_rule_wins_over_zero_rollout() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 0));
        store.push_rule(TargetingRule::new("beta", "country", "in", "A,B,C"));
        let evaluator = evaluator_for(&store);

        let hit = evaluator
            .evaluate("beta", "u1", &attrs(&[("country", "B")]))
            .await
            .unwrap();
        assert!(hit.enabled);
        assert_eq!(hit.reason_text(), "targeting rule matched: country in A,B,C");

        let miss = evaluator
            .evaluate("beta", "u1", &attrs(&[("country", "D")]))
            .await
            .unwrap();
        assert!(!miss.enabled);
        assert_eq!(miss.reason_text(), "outside rollout bucket 27 >= 0%");
    }

    #[tokio::test]
    async fn test_zero_rollout_excludes_everyone() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 0));
        let evaluator = evaluator_for(&store);

        for i in 0..100 {
            let user = format!("user-{i}");
            let result = evaluator.evaluate("beta", &user, &attrs(&[])).await.unwrap();
            let expected = format!("outside rollout bucket {} >= 0%", bucket("beta", &user));

            assert!(!result.enabled);
            assert_eq!(result.reason_text(), expected);
        }
    }

    #[tokio::test]
    async fn test_partial_rollout_uses_bucket() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 50));
        let evaluator = evaluator_for(&store);

        // bucket("beta", "u1") == 27, bucket("beta", "u2") == 65
        let u1 = evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap();
        assert!(u1.enabled);
        assert_eq!(u1.reason_text(), "in rollout bucket 27 < 50%");

        let u2 = evaluator.evaluate("beta", "u2", &attrs(&[])).await.unwrap();
        assert!(!u2.enabled);
        assert_eq!(u2.reason_text(), "outside rollout bucket 65 >= 50%");
    }

    #[tokio::test]
    async fn test_bucket_stable_when_rollout_changes() {
        let store = Arc::new(MemoryStore::new());
        let evaluator = evaluator_for(&store);

        let mut reasons = Vec::new();
        for rollout in [10, 27, 28, 90] {
            store.put_flag(enabled_flag("beta", rollout));
            let result = evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap();
            reasons.push((result.enabled, result.reason_text()));
        }

        assert_eq!(
            reasons,
            vec![
                (false, "outside rollout bucket 27 >= 10%".to_string()),
                (false, "outside rollout bucket 27 >= 27%".to_string()),
                (true, "in rollout bucket 27 < 28%".to_string()),
                (true, "in rollout bucket 27 < 90%".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_evaluation_is_deterministic() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 35));
        store.push_rule(TargetingRule::new("beta", "email", "contains", "@corp"));
        let evaluator = evaluator_for(&store);
        let attributes = attrs(&[("email", "bob@home.net")]);

        let first = evaluator.evaluate("beta", "user-42", &attributes).await.unwrap();
        let second = evaluator.evaluate("beta", "user-42", &attributes).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_writes_are_visible_to_next_call() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 0));
        let evaluator = evaluator_for(&store);

        let before = evaluator
            .evaluate("beta", "u1", &attrs(&[("plan", "gold")]))
            .await
            .unwrap();
        assert!(!before.enabled);

        store.push_rule(TargetingRule::new("beta", "plan", "equals", "gold"));
        let after = evaluator
            .evaluate("beta", "u1", &attrs(&[("plan", "gold")]))
            .await
            .unwrap();
        assert!(after.enabled);

        store.remove_flag("beta");
        let removed = evaluator
            .evaluate("beta", "u1", &attrs(&[("plan", "gold")]))
            .await
            .unwrap();
        assert_eq!(removed.reason_text(), "flag not found");
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 100));
        let metrics = Arc::new(MetricsRegistry::new());
        let evaluator = evaluator_for(&store).with_metrics(metrics.clone());

        evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap();
        evaluator.evaluate("missing", "u1", &attrs(&[])).await.unwrap();

        assert_eq!(metrics.evaluations_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.outcome_full_rollout.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.outcome_flag_not_found.load(Ordering::Relaxed), 1);
    }

    struct FailingRules;

    #[async_trait]
    impl RuleStore for FailingRules {
        async fn get_by_flag_name(&self, _flag_name: &str) -> anyhow::Result<Vec<TargetingRule>> {
            Err(anyhow::anyhow!("connection refused"))
        }

        async fn insert_rule(&self, _rule: &TargetingRule) -> Result<(), StoreError> {
            Err(StoreError::Backend(anyhow::anyhow!("connection refused")))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.put_flag(enabled_flag("beta", 100));
        let metrics = Arc::new(MetricsRegistry::new());
        let evaluator =
            Evaluator::new(store.clone(), Arc::new(FailingRules)).with_metrics(metrics.clone());

        let err = evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap_err();

        assert!(matches!(err, EvaluationError::RuleStore(_)));
        assert_eq!(metrics.evaluation_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.evaluations_total.load(Ordering::Relaxed), 0);

        // Disabled and missing flags never reach the rule store
        let mut disabled = enabled_flag("beta", 100);
        disabled.set_enabled(false);
        store.put_flag(disabled);
        let result = evaluator.evaluate("beta", "u1", &attrs(&[])).await.unwrap();
        assert_eq!(result.reason_text(), "flag disabled");
    }
}
