// src/storage/postgres.rs
use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

use crate::domain::{parse_rollout, Flag, TargetingRule};

use super::traits::{FlagStore, RuleStore, Store, StoreError};

/// PostgreSQL implementation of the flag and rule stores.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgresStore instance with a connection pool.
    pub async fn connect(
        database_url: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(min_connections)
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn flag_from_row(row: &PgRow) -> anyhow::Result<Flag> {
    let name: String = row.try_get("name")?;
    let rollout: i32 = row.try_get("rollout_percentage")?;
    let rollout_percentage =
        parse_rollout(i64::from(rollout)).with_context(|| format!("flag {name}"))?;

    Ok(Flag {
        description: row.try_get("description")?,
        enabled: row.try_get("enabled")?,
        rollout_percentage,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        name,
    })
}

fn rule_from_row(row: &PgRow) -> anyhow::Result<TargetingRule> {
    Ok(TargetingRule {
        id: row.try_get("id")?,
        flag_name: row.try_get("flag_name")?,
        attribute: row.try_get("attribute")?,
        operator: row.try_get("operator")?,
        value: row.try_get("value")?,
        created_at: row.try_get("created_at")?,
    })
}

fn write_error(err: sqlx::Error, flag_name: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Duplicate(flag_name.to_string());
        }
        if db.is_foreign_key_violation() {
            return StoreError::MissingFlag(flag_name.to_string());
        }
    }
    StoreError::Backend(err.into())
}

#[async_trait]
impl FlagStore for PostgresStore {
    async fn get_by_name(&self, name: &str) -> anyhow::Result<Option<Flag>> {
        let row = sqlx::query(
            r#"
            SELECT name, description, enabled, rollout_percentage, created_at, updated_at
            FROM feature_flags
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(flag_from_row(&row)?))
    }

    async fn list_flags(&self) -> anyhow::Result<Vec<Flag>> {
        sqlx::query(
            r#"
            SELECT name, description, enabled, rollout_percentage, created_at, updated_at
            FROM feature_flags
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(flag_from_row)
        .collect()
    }

    async fn insert_flag(&self, flag: &Flag) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO feature_flags (name, description, enabled, rollout_percentage, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&flag.name)
        .bind(&flag.description)
        .bind(flag.enabled)
        .bind(i32::from(flag.rollout_percentage))
        .bind(flag.created_at)
        .bind(flag.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &flag.name))?;

        Ok(())
    }

    async fn update_flag(&self, flag: &Flag) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE feature_flags
            SET description = $2,
                enabled = $3,
                rollout_percentage = $4,
                updated_at = $5
            WHERE name = $1
            "#,
        )
        .bind(&flag.name)
        .bind(&flag.description)
        .bind(flag.enabled)
        .bind(i32::from(flag.rollout_percentage))
        .bind(flag.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &flag.name))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MissingFlag(flag.name.clone()));
        }

        Ok(())
    }
}

#[async_trait]
impl RuleStore for PostgresStore {
    async fn get_by_flag_name(&self, flag_name: &str) -> anyhow::Result<Vec<TargetingRule>> {
        sqlx::query(
            r#"
            SELECT id, flag_name, attribute, operator, value, created_at
            FROM targeting_rules
            WHERE flag_name = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(flag_name)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(rule_from_row)
        .collect()
    }

    async fn insert_rule(&self, rule: &TargetingRule) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO targeting_rules (id, flag_name, attribute, operator, value, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(rule.id)
        .bind(&rule.flag_name)
        .bind(&rule.attribute)
        .bind(&rule.operator)
        .bind(&rule.value)
        .bind(rule.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, &rule.flag_name))?;

        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
