//! User table operations

use anyhow::Result;
use sqlx::{FromRow, SqlitePool};

use crate::models::User;

/// Database row for user table
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password: String,
    created_at: i64,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            password: self.password,
            created_at: self.created_at,
        }
    }
}

/// User table operations
pub struct UserTable;

impl UserTable {
    /// Get user by ID
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Get user by email (case-insensitive)
    pub async fn get_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as("SELECT * FROM user WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;

        Ok(row.map(|r| r.into_user()))
    }

    /// Insert a user
    pub async fn insert(pool: &SqlitePool, user: &User) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO user (username, email, password, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(user.email.trim())
        .bind(&user.password)
        .bind(user.created_at)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}
