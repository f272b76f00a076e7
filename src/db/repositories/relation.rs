//! User-to-recipe relation repository
//!
//! Favorites and shopping cart rows share one repository; the
//! `RelationKind` selects the backing table. Duplicate pairs are rejected
//! by the unique index on (user_id, recipe_id), never by a prior lookup,
//! so concurrent inserts of the same pair leave exactly one row. A recipe
//! deleted before the insert lands is caught by the foreign key.

use crate::config::DatabaseDriver;
use crate::db::{is_foreign_key_violation, is_unique_violation, mysql, sqlite, DynDatabasePool};
use crate::models::{RelationKind, RelationRow};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Result of inserting a relation row
#[derive(Debug, Clone, PartialEq)]
pub enum AddRelation {
    Added(RelationRow),
    /// The pair is already present for this kind
    AlreadyExists,
    /// The recipe or user row is gone
    MissingTarget,
}

/// Relation repository trait
#[async_trait]
pub trait RelationRepository: Send + Sync {
    /// Insert a relation row
    async fn add(&self, kind: RelationKind, user_id: i64, recipe_id: i64) -> Result<AddRelation>;

    /// Delete a relation row. Returns whether a row was deleted.
    async fn remove(&self, kind: RelationKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Get a relation row
    async fn get(&self, kind: RelationKind, user_id: i64, recipe_id: i64)
        -> Result<Option<RelationRow>>;

    /// Check if a relation row exists
    async fn exists(&self, kind: RelationKind, user_id: i64, recipe_id: i64) -> Result<bool>;

    /// Recipe IDs related to a user, in insertion order
    async fn recipe_ids(&self, kind: RelationKind, user_id: i64) -> Result<Vec<i64>>;
}

/// SQLx-based relation repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRelationRepository {
    pool: DynDatabasePool,
}

impl SqlxRelationRepository {
    /// Create a new SQLx relation repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RelationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RelationRepository for SqlxRelationRepository {
    async fn add(
        &self,
        kind: RelationKind,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<AddRelation> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_relation_sqlite(sqlite(&self.pool)?, kind, user_id, recipe_id).await
            }
            DatabaseDriver::Mysql => {
                add_relation_mysql(mysql(&self.pool)?, kind, user_id, recipe_id).await
            }
        }
    }

    async fn remove(&self, kind: RelationKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                remove_relation_sqlite(sqlite(&self.pool)?, kind, user_id, recipe_id).await
            }
            DatabaseDriver::Mysql => {
                remove_relation_mysql(mysql(&self.pool)?, kind, user_id, recipe_id).await
            }
        }
    }

    async fn get(
        &self,
        kind: RelationKind,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<Option<RelationRow>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_relation_sqlite(sqlite(&self.pool)?, kind, user_id, recipe_id).await
            }
            DatabaseDriver::Mysql => {
                get_relation_mysql(mysql(&self.pool)?, kind, user_id, recipe_id).await
            }
        }
    }

    async fn exists(&self, kind: RelationKind, user_id: i64, recipe_id: i64) -> Result<bool> {
        Ok(self.get(kind, user_id, recipe_id).await?.is_some())
    }

    async fn recipe_ids(&self, kind: RelationKind, user_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                relation_recipe_ids_sqlite(sqlite(&self.pool)?, kind, user_id).await
            }
            DatabaseDriver::Mysql => {
                relation_recipe_ids_mysql(mysql(&self.pool)?, kind, user_id).await
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn add_relation_sqlite(
    pool: &SqlitePool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<AddRelation> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO {} (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .bind(now)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(AddRelation::Added(RelationRow {
            id: result.last_insert_rowid(),
            kind,
            user_id,
            recipe_id,
            created_at: now,
        })),
        Err(err) if is_unique_violation(&err) => Ok(AddRelation::AlreadyExists),
        Err(err) if is_foreign_key_violation(&err) => Ok(AddRelation::MissingTarget),
        Err(err) => Err(err).with_context(|| format!("Failed to add {} row", kind)),
    }
}

async fn remove_relation_sqlite(
    pool: &SqlitePool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to remove {} row", kind))?;

    Ok(result.rows_affected() > 0)
}

async fn get_relation_sqlite(
    pool: &SqlitePool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<Option<RelationRow>> {
    let sql = format!(
        "SELECT id, user_id, recipe_id, created_at FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    );

    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} row", kind))?;

    Ok(row.map(|row| RelationRow {
        id: row.get("id"),
        kind,
        user_id: row.get("user_id"),
        recipe_id: row.get("recipe_id"),
        created_at: row.get("created_at"),
    }))
}

async fn relation_recipe_ids_sqlite(
    pool: &SqlitePool,
    kind: RelationKind,
    user_id: i64,
) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT recipe_id FROM {} WHERE user_id = ? ORDER BY id",
        kind.table()
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} recipe IDs", kind))?;

    Ok(rows.iter().map(|row| row.get("recipe_id")).collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn add_relation_mysql(
    pool: &MySqlPool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<AddRelation> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO {} (user_id, recipe_id, created_at) VALUES (?, ?, ?)",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .bind(now)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(AddRelation::Added(RelationRow {
            id: result.last_insert_id() as i64,
            kind,
            user_id,
            recipe_id,
            created_at: now,
        })),
        Err(err) if is_unique_violation(&err) => Ok(AddRelation::AlreadyExists),
        Err(err) if is_foreign_key_violation(&err) => Ok(AddRelation::MissingTarget),
        Err(err) => Err(err).with_context(|| format!("Failed to add {} row", kind)),
    }
}

async fn remove_relation_mysql(
    pool: &MySqlPool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to remove {} row", kind))?;

    Ok(result.rows_affected() > 0)
}

async fn get_relation_mysql(
    pool: &MySqlPool,
    kind: RelationKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<Option<RelationRow>> {
    let sql = format!(
        "SELECT id, user_id, recipe_id, created_at FROM {} WHERE user_id = ? AND recipe_id = ?",
        kind.table()
    );

    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to get {} row", kind))?;

    Ok(row.map(|row| RelationRow {
        id: row.get("id"),
        kind,
        user_id: row.get("user_id"),
        recipe_id: row.get("recipe_id"),
        created_at: row.get("created_at"),
    }))
}

async fn relation_recipe_ids_mysql(
    pool: &MySqlPool,
    kind: RelationKind,
    user_id: i64,
) -> Result<Vec<i64>> {
    let sql = format!(
        "SELECT recipe_id FROM {} WHERE user_id = ? ORDER BY id",
        kind.table()
    );

    let rows = sqlx::query(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("Failed to list {} recipe IDs", kind))?;

    Ok(rows.iter().map(|row| row.get("recipe_id")).collect())
}
