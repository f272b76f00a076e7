//! Ingredient repository
//!
//! Database operations for ingredients.
//!
//! This module provides:
//! - `IngredientRepository` trait defining the interface for ingredient data access
//! - `SqlxIngredientRepository` implementing the trait for SQLite and MySQL

use super::placeholders;
use crate::config::DatabaseDriver;
use crate::db::{is_unique_violation, mysql, sqlite, DynDatabasePool};
use crate::models::{CreateIngredientInput, Ingredient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Ingredient repository trait
#[async_trait]
pub trait IngredientRepository: Send + Sync {
    /// Create a new ingredient.
    ///
    /// Returns `None` when the (name, measurement_unit) pair already exists.
    async fn create(&self, input: &CreateIngredientInput) -> Result<Option<Ingredient>>;

    /// Get ingredient by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>>;

    /// Get ingredient by its (name, measurement_unit) pair
    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>>;

    /// List ingredients ordered by name, optionally restricted to names
    /// starting with `prefix` (case-insensitive)
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>>;

    /// Get every existing ingredient among `ids`
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>>;
}

/// SQLx-based ingredient repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxIngredientRepository {
    pool: DynDatabasePool,
}

impl SqlxIngredientRepository {
    /// Create a new SQLx ingredient repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn IngredientRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl IngredientRepository for SqlxIngredientRepository {
    async fn create(&self, input: &CreateIngredientInput) -> Result<Option<Ingredient>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_ingredient_sqlite(sqlite(&self.pool)?, input).await,
            DatabaseDriver::Mysql => create_ingredient_mysql(mysql(&self.pool)?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ingredient>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_ingredient_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_ingredient_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_name_and_unit(&self, name: &str, unit: &str) -> Result<Option<Ingredient>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_ingredient_by_name_and_unit_sqlite(sqlite(&self.pool)?, name, unit).await
            }
            DatabaseDriver::Mysql => {
                get_ingredient_by_name_and_unit_mysql(mysql(&self.pool)?, name, unit).await
            }
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>> {
        let pattern = prefix
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}%", escape_like(&p.to_lowercase())));

        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_ingredients_sqlite(sqlite(&self.pool)?, pattern).await,
            DatabaseDriver::Mysql => list_ingredients_mysql(mysql(&self.pool)?, pattern).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Ingredient>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_ingredients_by_ids_sqlite(sqlite(&self.pool)?, ids).await,
            DatabaseDriver::Mysql => get_ingredients_by_ids_mysql(mysql(&self.pool)?, ids).await,
        }
    }
}

/// Escape LIKE wildcards using `!` as the escape character
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '!' | '%' | '_') {
            escaped.push('!');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_ingredient_sqlite(
    pool: &SqlitePool,
    input: &CreateIngredientInput,
) -> Result<Option<Ingredient>> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(Some(Ingredient {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create ingredient"),
    }
}

async fn get_ingredient_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Ingredient>> {
    let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get ingredient by ID")?;

    Ok(row.as_ref().map(row_to_ingredient_sqlite))
}

async fn get_ingredient_by_name_and_unit_sqlite(
    pool: &SqlitePool,
    name: &str,
    unit: &str,
) -> Result<Option<Ingredient>> {
    let row = sqlx::query(
        "SELECT id, name, measurement_unit FROM ingredients WHERE name = ? AND measurement_unit = ?",
    )
    .bind(name)
    .bind(unit)
    .fetch_optional(pool)
    .await
    .context("Failed to get ingredient by name and unit")?;

    Ok(row.as_ref().map(row_to_ingredient_sqlite))
}

async fn list_ingredients_sqlite(
    pool: &SqlitePool,
    pattern: Option<String>,
) -> Result<Vec<Ingredient>> {
    let rows = match pattern {
        Some(pattern) => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE LOWER(name) LIKE ? ESCAPE '!'
                ORDER BY name, measurement_unit
                "#,
            )
            .bind(pattern)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit",
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list ingredients")?;

    Ok(rows.iter().map(row_to_ingredient_sqlite).collect())
}

async fn get_ingredients_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Ingredient>> {
    let sql = format!(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id IN ({}) ORDER BY name",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get ingredients by IDs")?;

    Ok(rows.iter().map(row_to_ingredient_sqlite).collect())
}

fn row_to_ingredient_sqlite(row: &sqlx::sqlite::SqliteRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_ingredient_mysql(
    pool: &MySqlPool,
    input: &CreateIngredientInput,
) -> Result<Option<Ingredient>> {
    let result = sqlx::query("INSERT INTO ingredients (name, measurement_unit) VALUES (?, ?)")
        .bind(&input.name)
        .bind(&input.measurement_unit)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(Some(Ingredient {
            id: result.last_insert_id() as i64,
            name: input.name.clone(),
            measurement_unit: input.measurement_unit.clone(),
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create ingredient"),
    }
}

async fn get_ingredient_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Ingredient>> {
    let row = sqlx::query("SELECT id, name, measurement_unit FROM ingredients WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get ingredient by ID")?;

    Ok(row.as_ref().map(row_to_ingredient_mysql))
}

async fn get_ingredient_by_name_and_unit_mysql(
    pool: &MySqlPool,
    name: &str,
    unit: &str,
) -> Result<Option<Ingredient>> {
    let row = sqlx::query(
        "SELECT id, name, measurement_unit FROM ingredients WHERE name = ? AND measurement_unit = ?",
    )
    .bind(name)
    .bind(unit)
    .fetch_optional(pool)
    .await
    .context("Failed to get ingredient by name and unit")?;

    Ok(row.as_ref().map(row_to_ingredient_mysql))
}

async fn list_ingredients_mysql(
    pool: &MySqlPool,
    pattern: Option<String>,
) -> Result<Vec<Ingredient>> {
    let rows = match pattern {
        Some(pattern) => {
            sqlx::query(
                r#"
                SELECT id, name, measurement_unit
                FROM ingredients
                WHERE LOWER(name) LIKE ? ESCAPE '!'
                ORDER BY name, measurement_unit
                "#,
            )
            .bind(pattern)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query(
                "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit",
            )
            .fetch_all(pool)
            .await
        }
    }
    .context("Failed to list ingredients")?;

    Ok(rows.iter().map(row_to_ingredient_mysql).collect())
}

async fn get_ingredients_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Ingredient>> {
    let sql = format!(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id IN ({}) ORDER BY name",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get ingredients by IDs")?;

    Ok(rows.iter().map(row_to_ingredient_mysql).collect())
}

fn row_to_ingredient_mysql(row: &sqlx::mysql::MySqlRow) -> Ingredient {
    Ingredient {
        id: row.get("id"),
        name: row.get("name"),
        measurement_unit: row.get("measurement_unit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxIngredientRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxIngredientRepository::new(pool)
    }

    async fn create(repo: &SqlxIngredientRepository, name: &str, unit: &str) -> Ingredient {
        repo.create(&CreateIngredientInput::new(name, unit))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_same_name_different_units() {
        let repo = setup().await;

        let grams = create(&repo, "sugar", "g").await;
        let spoons = create(&repo, "sugar", "tbsp").await;
        assert_ne!(grams.id, spoons.id);

        let duplicate = repo
            .create(&CreateIngredientInput::new("sugar", "g"))
            .await
            .unwrap();
        assert!(duplicate.is_none());

        let found = repo.get_by_name_and_unit("sugar", "tbsp").await.unwrap();
        assert_eq!(found, Some(spoons));
    }

    #[tokio::test]
    async fn test_prefix_search_is_case_insensitive() {
        let repo = setup().await;
        create(&repo, "Salt", "g").await;
        create(&repo, "salmon", "g").await;
        create(&repo, "basil", "g").await;
        create(&repo, "50%_cream", "ml").await;

        let names: Vec<String> = repo
            .list(Some("SAL"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Salt".to_string()));
        assert!(names.contains(&"salmon".to_string()));

        assert_eq!(repo.list(Some("50%_")).await.unwrap().len(), 1);
        assert!(repo.list(Some("5_")).await.unwrap().is_empty());
        assert_eq!(repo.list(None).await.unwrap().len(), 4);
        assert_eq!(repo.list(Some("")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_get_by_ids() {
        let repo = setup().await;
        let flour = create(&repo, "flour", "g").await;

        let found = repo.get_by_ids(&[flour.id, 77]).await.unwrap();
        assert_eq!(found, vec![flour]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c!d"), "a!%b!_c!!d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
