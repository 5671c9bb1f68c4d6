use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{parse_rollout, Flag, InvalidRollout, TargetingRule};
use crate::observability::MetricsRegistry;
use crate::rules::Operator;
use crate::storage::{Store, StoreError};

/// Errors from administrative operations.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("flag not found: {0}")]
    NotFound(String),

    #[error("flag already exists: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0:#}")]
    Store(anyhow::Error),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(name) => AdminError::Conflict(name),
            StoreError::MissingFlag(name) => AdminError::NotFound(name),
            StoreError::Backend(e) => AdminError::Store(e),
        }
    }
}

impl From<InvalidRollout> for AdminError {
    fn from(err: InvalidRollout) -> Self {
        AdminError::Validation(err.to_string())
    }
}

/// Partial update of a flag; absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct FlagUpdate {
    pub enabled: Option<bool>,
    pub rollout_percentage: Option<i64>,
}

/// Create, update and list flags and their targeting rules.
#[derive(Clone)]
pub struct FlagAdmin {
    store: Arc<dyn Store>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl FlagAdmin {
    pub fn new(store: Arc<dyn Store>) -> Self {
        FlagAdmin {
            store,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record_write<T>(&self, result: &Result<T, AdminError>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_admin_write(result.is_ok());
        }
    }

    /// Create a disabled flag with full rollout.
    pub async fn create_flag(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Flag, AdminError> {
        let result = self.try_create_flag(name, description).await;
        self.record_write(&result);
        result
    }

    async fn try_create_flag(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Flag, AdminError> {
        if name.trim().is_empty() {
            return Err(AdminError::Validation("flag name cannot be empty".to_string()));
        }

        let flag = Flag::new(name, description);
        self.store.insert_flag(&flag).await?;

        info!(flag = %flag.name, "Flag created");
        Ok(flag)
    }

    /// All flags, ordered by name.
    pub async fn list_flags(&self) -> Result<Vec<Flag>, AdminError> {
        self.store.list_flags().await.map_err(AdminError::Store)
    }

    /// Apply a partial update; `updated_at` moves only when a field is set.
    pub async fn update_flag(&self, name: &str, update: FlagUpdate) -> Result<Flag, AdminError> {
        let result = self.try_update_flag(name, update).await;
        self.record_write(&result);
        result
    }

    async fn try_update_flag(&self, name: &str, update: FlagUpdate) -> Result<Flag, AdminError> {
        let rollout = update.rollout_percentage.map(parse_rollout).transpose()?;

        let mut flag = self
            .store
            .get_by_name(name)
            .await
            .map_err(AdminError::Store)?
            .ok_or_else(|| AdminError::NotFound(name.to_string()))?;

        if let Some(enabled) = update.enabled {
            flag.set_enabled(enabled);
        }
        if let Some(percentage) = rollout {
            flag.set_rollout_percentage(percentage)?;
        }

        self.store.update_flag(&flag).await?;

        info!(
            flag = %flag.name,
            enabled = flag.enabled,
            rollout_percentage = flag.rollout_percentage,
            "Flag updated"
        );
        Ok(flag)
    }

    /// Attach a targeting rule to an existing flag.
    ///
    /// Operator names outside the supported set are stored as given; such
    /// rules never match.
    pub async fn add_rule(
        &self,
        flag_name: &str,
        attribute: &str,
        operator: &str,
        value: &str,
    ) -> Result<TargetingRule, AdminError> {
        let result = self.try_add_rule(flag_name, attribute, operator, value).await;
        self.record_write(&result);
        result
    }

    async fn try_add_rule(
        &self,
        flag_name: &str,
        attribute: &str,
        operator: &str,
        value: &str,
    ) -> Result<TargetingRule, AdminError> {
        if Operator::from_name(operator).is_none() {
            warn!(flag = flag_name, operator = operator, "Rule uses unknown operator and will never match");
        }

        let rule = TargetingRule::new(flag_name, attribute, operator, value);
        self.store.insert_rule(&rule).await?;

        info!(flag = flag_name, rule_id = %rule.id, rule = %rule.describe(), "Targeting rule added");
        Ok(rule)
    }

    /// Rules of a flag in evaluation order.
    pub async fn list_rules(&self, flag_name: &str) -> Result<Vec<TargetingRule>, AdminError> {
        self.store
            .get_by_flag_name(flag_name)
            .await
            .map_err(AdminError::Store)
    }
}
