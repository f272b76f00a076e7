//! Shopping list repository
//!
//! Aggregates the ingredients of every recipe in a user's shopping cart:
//! rows are grouped by (ingredient name, measurement unit), amounts are
//! summed as 64-bit integers and the result is ordered by name.

use crate::config::DatabaseDriver;
use crate::db::{mysql, sqlite, DynDatabasePool};
use crate::models::ShoppingListItem;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Shopping list repository trait
#[async_trait]
pub trait ShoppingListRepository: Send + Sync {
    /// Consolidated ingredient totals over the user's cart
    async fn aggregate(&self, user_id: i64) -> Result<Vec<ShoppingListItem>>;
}

/// SQLx-based shopping list repository implementation
pub struct SqlxShoppingListRepository {
    pool: DynDatabasePool,
}

impl SqlxShoppingListRepository {
    /// Create a new SQLx shopping list repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ShoppingListRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ShoppingListRepository for SqlxShoppingListRepository {
    async fn aggregate(&self, user_id: i64) -> Result<Vec<ShoppingListItem>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => aggregate_sqlite(sqlite(&self.pool)?, user_id).await,
            DatabaseDriver::Mysql => aggregate_mysql(mysql(&self.pool)?, user_id).await,
        }
    }
}

async fn aggregate_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<ShoppingListItem>> {
    let rows = sqlx::query(
        r#"
        SELECT i.name AS name, i.measurement_unit AS measurement_unit,
               SUM(ri.amount) AS total_amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to aggregate shopping list")?;

    Ok(rows
        .iter()
        .map(|row| ShoppingListItem {
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            total_amount: row.get("total_amount"),
        })
        .collect())
}

async fn aggregate_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<ShoppingListItem>> {
    // SUM yields DECIMAL on MySQL
    let rows = sqlx::query(
        r#"
        SELECT i.name AS name, i.measurement_unit AS measurement_unit,
               CAST(SUM(ri.amount) AS SIGNED) AS total_amount
        FROM shopping_cart sc
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE sc.user_id = ?
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to aggregate shopping list")?;

    Ok(rows
        .iter()
        .map(|row| ShoppingListItem {
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            total_amount: row.get("total_amount"),
        })
        .collect())
}
