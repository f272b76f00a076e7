//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::{is_unique_violation, mysql, sqlite, DynDatabasePool};
use crate::models::{CreateUserInput, User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user.
    ///
    /// The first user ever created is an admin. The role is decided by the
    /// insert statement itself, so concurrent first registrations cannot
    /// both become admin. Returns `None` when the username or email is
    /// already taken.
    async fn create(&self, input: &CreateUserInput) -> Result<Option<User>>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// List all users ordered by ID
    async fn list(&self) -> Result<Vec<User>>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(sqlite(&self.pool)?, input).await,
            DatabaseDriver::Mysql => create_user_mysql(mysql(&self.pool)?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_users_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_users_mysql(mysql(&self.pool)?).await,
        }
    }
}

/// Insert a user, making them admin when the table is still empty
const FIRST_USER_IS_ADMIN_INSERT: &str = r#"
    INSERT INTO users (username, email, first_name, last_name, role, created_at)
    SELECT ?, ?, ?, ?, CASE WHEN COUNT(*) = 0 THEN 'admin' ELSE 'user' END, ?
    FROM users
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<Option<User>> {
    let result = sqlx::query(FIRST_USER_IS_ADMIN_INSERT)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(Utc::now())
        .execute(pool)
        .await;

    let result = match result {
        Ok(result) => result,
        Err(err) if is_unique_violation(&err) => return Ok(None),
        Err(err) => return Err(err).context("Failed to create user"),
    };

    get_user_by_id_sqlite(pool, result.last_insert_rowid()).await
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, role, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn list_users_sqlite(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, role, created_at
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    rows.iter().map(row_to_user_sqlite).collect()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<Option<User>> {
    let result = sqlx::query(FIRST_USER_IS_ADMIN_INSERT)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(Utc::now())
        .execute(pool)
        .await;

    let result = match result {
        Ok(result) => result,
        Err(err) if is_unique_violation(&err) => return Ok(None),
        Err(err) => return Err(err).context("Failed to create user"),
    };

    get_user_by_id_mysql(pool, result.last_insert_id() as i64).await
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, role, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn list_users_mysql(pool: &MySqlPool) -> Result<Vec<User>> {
    let rows = sqlx::query(
        r#"
        SELECT id, username, email, first_name, last_name, role, created_at
        FROM users
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list users")?;

    rows.iter().map(row_to_user_mysql).collect()
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role_str: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        role: UserRole::from_str(&role_str)?,
        created_at: row.get("created_at"),
    })
}
