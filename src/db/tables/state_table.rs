//! System state table operations (named integer values shared by all rounds)

use anyhow::Result;
use sqlx::{Executor, Sqlite};

/// Rotation cursor for rigged rounds
pub const CURRENT_SHUFFLE_INDEX: &str = "current_shuffle_index";
/// 1 while ordinary players are frozen on the current round
pub const IS_SHUFFLE_LOCKED: &str = "is_shuffle_locked";

/// System state table operations
pub struct StateTable;

impl StateTable {
    /// Read a value, persisting `default` first if the key has never been written
    pub async fn get_or_init<'e, E>(executor: E, key: &str, default: i64) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        // the no-op DO UPDATE makes RETURNING yield the stored row on conflict
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO system_state (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = value
            RETURNING value
            "#,
        )
        .bind(key)
        .bind(default)
        .fetch_one(executor)
        .await?;

        Ok(value)
    }

    /// Read a value without creating it
    pub async fn get<'e, E>(executor: E, key: &str) -> Result<Option<i64>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM system_state WHERE key = ?")
            .bind(key)
            .fetch_optional(executor)
            .await?;

        Ok(value)
    }

    /// Write a value
    pub async fn set<'e, E>(executor: E, key: &str, value: i64) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            INSERT INTO system_state (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Flip a 0/1 flag in one statement and return the new value.
    /// A missing key counts as 0, so the first flip stores 1.
    pub async fn toggle<'e, E>(executor: E, key: &str) -> Result<i64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO system_state (key, value) VALUES (?, 1)
            ON CONFLICT(key) DO UPDATE SET value = CASE WHEN value = 0 THEN 1 ELSE 0 END
            RETURNING value
            "#,
        )
        .bind(key)
        .fetch_one(executor)
        .await?;

        Ok(value)
    }
}
