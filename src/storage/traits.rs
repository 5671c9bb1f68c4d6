// src/storage/traits.rs
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Flag, TargetingRule};

/// Errors from store writes.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("flag already exists: {0}")]
    Duplicate(String),

    #[error("flag not found: {0}")]
    MissingFlag(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Durable storage of flags, keyed by name.
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Flag>>;
    async fn list_flags(&self) -> anyhow::Result<Vec<Flag>>;

    async fn insert_flag(&self, flag: &Flag) -> Result<(), StoreError>;
    async fn update_flag(&self, flag: &Flag) -> Result<(), StoreError>;
}

/// Durable storage of targeting rules, looked up by flag name.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Rules for a flag in insertion order (possibly empty).
    async fn get_by_flag_name(&self, flag_name: &str) -> anyhow::Result<Vec<TargetingRule>>;

    async fn insert_rule(&self, rule: &TargetingRule) -> Result<(), StoreError>;
}

/// A backend serving both flags and rules.
#[async_trait]
pub trait Store: FlagStore + RuleStore {
    /// Check the backend is reachable.
    async fn ping(&self) -> anyhow::Result<()>;

    /// Backend name for logs and readiness output.
    fn backend(&self) -> &'static str;
}
