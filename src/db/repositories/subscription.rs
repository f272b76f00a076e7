//! Subscription repository
//!
//! Database operations for follower-to-author subscriptions.

use crate::config::DatabaseDriver;
use crate::db::{is_unique_violation, mysql, sqlite, DynDatabasePool};
use crate::models::Subscription;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Create a subscription.
    ///
    /// Returns `None` when the pair already exists.
    async fn create(&self, user_id: i64, author_id: i64) -> Result<Option<Subscription>>;

    /// Delete a subscription. Returns whether a row was deleted.
    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Check if `user_id` follows `author_id`
    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Authors followed by a user, oldest subscription first
    async fn author_ids(&self, user_id: i64) -> Result<Vec<i64>>;
}

/// SQLx-based subscription repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSubscriptionRepository {
    pool: DynDatabasePool,
}

impl SqlxSubscriptionRepository {
    /// Create a new SQLx subscription repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SubscriptionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SubscriptionRepository for SqlxSubscriptionRepository {
    async fn create(&self, user_id: i64, author_id: i64) -> Result<Option<Subscription>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_subscription_sqlite(sqlite(&self.pool)?, user_id, author_id).await
            }
            DatabaseDriver::Mysql => {
                create_subscription_mysql(mysql(&self.pool)?, user_id, author_id).await
            }
        }
    }

    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_subscription_sqlite(sqlite(&self.pool)?, user_id, author_id).await
            }
            DatabaseDriver::Mysql => {
                delete_subscription_mysql(mysql(&self.pool)?, user_id, author_id).await
            }
        }
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                subscription_exists_sqlite(sqlite(&self.pool)?, user_id, author_id).await
            }
            DatabaseDriver::Mysql => {
                subscription_exists_mysql(mysql(&self.pool)?, user_id, author_id).await
            }
        }
    }

    async fn author_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => followed_author_ids_sqlite(sqlite(&self.pool)?, user_id).await,
            DatabaseDriver::Mysql => followed_author_ids_mysql(mysql(&self.pool)?, user_id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_subscription_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    author_id: i64,
) -> Result<Option<Subscription>> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(author_id)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(result) => Ok(Some(Subscription {
            id: result.last_insert_rowid(),
            user_id,
            author_id,
            created_at: now,
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create subscription"),
    }
}

async fn delete_subscription_sqlite(pool: &SqlitePool, user_id: i64, author_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("Failed to delete subscription")?;

    Ok(result.rows_affected() > 0)
}

async fn subscription_exists_sqlite(
    pool: &SqlitePool,
    user_id: i64,
    author_id: i64,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM subscriptions WHERE user_id = ? AND author_id = ?",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .context("Failed to check subscription")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn followed_author_ids_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT author_id FROM subscriptions WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list subscriptions")?;

    Ok(rows.iter().map(|row| row.get("author_id")).collect())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_subscription_mysql(
    pool: &MySqlPool,
    user_id: i64,
    author_id: i64,
) -> Result<Option<Subscription>> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO subscriptions (user_id, author_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(author_id)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(result) => Ok(Some(Subscription {
            id: result.last_insert_id() as i64,
            user_id,
            author_id,
            created_at: now,
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create subscription"),
    }
}

async fn delete_subscription_mysql(pool: &MySqlPool, user_id: i64, author_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND author_id = ?")
        .bind(user_id)
        .bind(author_id)
        .execute(pool)
        .await
        .context("Failed to delete subscription")?;

    Ok(result.rows_affected() > 0)
}

async fn subscription_exists_mysql(pool: &MySqlPool, user_id: i64, author_id: i64) -> Result<bool> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS count FROM subscriptions WHERE user_id = ? AND author_id = ?",
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(pool)
    .await
    .context("Failed to check subscription")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

async fn followed_author_ids_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<i64>> {
    let rows = sqlx::query("SELECT author_id FROM subscriptions WHERE user_id = ? ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list subscriptions")?;

    Ok(rows.iter().map(|row| row.get("author_id")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxSubscriptionRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        for name in ["reader", "chef", "baker"] {
            pool.execute(&format!(
                "INSERT INTO users (username, email) VALUES ('{0}', '{0}@example.com')",
                name
            ))
            .await
            .unwrap();
        }
        SqlxSubscriptionRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_duplicate_returns_none() {
        let repo = setup().await;

        let sub = repo.create(1, 2).await.unwrap().unwrap();
        assert_eq!(sub.user_id, 1);
        assert_eq!(sub.author_id, 2);

        assert!(repo.create(1, 2).await.unwrap().is_none());
        assert!(repo.exists(1, 2).await.unwrap());
        assert!(!repo.exists(2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_author_ids_in_subscription_order() {
        let repo = setup().await;
        repo.create(1, 3).await.unwrap();
        repo.create(1, 2).await.unwrap();

        assert_eq!(repo.author_ids(1).await.unwrap(), vec![3, 2]);
        assert!(repo.author_ids(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = setup().await;
        assert!(!repo.delete(1, 2).await.unwrap());

        repo.create(1, 2).await.unwrap();
        assert!(repo.delete(1, 2).await.unwrap());
        assert!(!repo.exists(1, 2).await.unwrap());
    }
}
