// src/storage/memory.rs
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::domain::{Flag, TargetingRule};

use super::traits::{FlagStore, RuleStore, Store, StoreError};

/// In-process store. Rules keep their insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    flags: RwLock<BTreeMap<String, Flag>>,
    rules: RwLock<Vec<TargetingRule>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a flag directly (for seeding and tests).
    pub fn put_flag(&self, flag: Flag) {
        self.flags.write().insert(flag.name.clone(), flag);
    }

    /// Append a rule without checking its flag exists (for seeding and tests).
    pub fn push_rule(&self, rule: TargetingRule) {
        self.rules.write().push(rule);
    }

    /// Remove a flag and its rules.
    pub fn remove_flag(&self, name: &str) {
        self.flags.write().remove(name);
        self.rules.write().retain(|r| r.flag_name != name);
    }
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Flag>> {
        Ok(self.flags.read().get(name).cloned())
    }

    async fn list_flags(&self) -> anyhow::Result<Vec<Flag>> {
        Ok(self.flags.read().values().cloned().collect())
    }

    async fn insert_flag(&self, flag: &Flag) -> Result<(), StoreError> {
        let mut flags = self.flags.write();
        if flags.contains_key(&flag.name) {
            return Err(StoreError::Duplicate(flag.name.clone()));
        }
        flags.insert(flag.name.clone(), flag.clone());
        Ok(())
    }

    async fn update_flag(&self, flag: &Flag) -> Result<(), StoreError> {
        match self.flags.write().get_mut(&flag.name) {
            Some(existing) => {
                *existing = flag.clone();
                Ok(())
            }
            None => Err(StoreError::MissingFlag(flag.name.clone())),
        }
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn get_by_flag_name(&self, flag_name: &str) -> anyhow::Result<Vec<TargetingRule>> {
        Ok(self
            .rules
            .read()
            .iter()
            .filter(|r| r.flag_name == flag_name)
            .cloned()
            .collect())
    }

    async fn insert_rule(&self, rule: &TargetingRule) -> Result<(), StoreError> {
        if !self.flags.read().contains_key(&rule.flag_name) {
            return Err(StoreError::MissingFlag(rule.flag_name.clone()));
        }
        self.rules.write().push(rule.clone());
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
