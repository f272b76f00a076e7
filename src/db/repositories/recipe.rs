//! Recipe repository
//!
//! Database operations for recipes and their composition (tags and
//! ingredient rows with amounts).
//!
//! This module provides:
//! - `RecipeRepository` trait defining the interface for recipe data access
//! - `SqlxRecipeRepository` implementing the trait for SQLite and MySQL
//!
//! Create and update run in a single transaction. Update replaces the
//! whole tag set and ingredient set: existing composition rows are deleted
//! and the new ones inserted.

use super::placeholders;
use crate::config::DatabaseDriver;
use crate::db::{mysql, sqlite, DynDatabasePool};
use crate::models::{IngredientAmount, Recipe, RecipeFilter, RecipeInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, Row, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, r.created_at, r.updated_at";

/// Recipe repository trait
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    /// Create a recipe with its tags and ingredients
    async fn create(&self, author_id: i64, input: &RecipeInput) -> Result<Recipe>;

    /// Replace a recipe's fields and composition.
    ///
    /// Returns `None` if the recipe does not exist.
    async fn update(&self, id: i64, input: &RecipeInput) -> Result<Option<Recipe>>;

    /// Delete a recipe. Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Get recipe by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>>;

    /// List recipes matching a filter, newest first.
    ///
    /// `viewer_id` resolves the favorite and shopping cart flags of the filter.
    async fn list(&self, filter: &RecipeFilter, viewer_id: Option<i64>) -> Result<Vec<Recipe>>;

    /// List an author's recipes, newest first
    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>>;

    /// Count an author's recipes
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;

    /// Ingredients of a recipe with their amounts, in insertion order
    async fn get_ingredients(&self, recipe_id: i64) -> Result<Vec<IngredientAmount>>;
}

/// SQLx-based recipe repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxRecipeRepository {
    pool: DynDatabasePool,
}

impl SqlxRecipeRepository {
    /// Create a new SQLx recipe repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RecipeRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl RecipeRepository for SqlxRecipeRepository {
    async fn create(&self, author_id: i64, input: &RecipeInput) -> Result<Recipe> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_recipe_sqlite(sqlite(&self.pool)?, author_id, input).await,
            DatabaseDriver::Mysql => create_recipe_mysql(mysql(&self.pool)?, author_id, input).await,
        }
    }

    async fn update(&self, id: i64, input: &RecipeInput) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_recipe_sqlite(sqlite(&self.pool)?, id, input).await,
            DatabaseDriver::Mysql => update_recipe_mysql(mysql(&self.pool)?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_recipe_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => delete_recipe_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_recipe_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_recipe_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn list(&self, filter: &RecipeFilter, viewer_id: Option<i64>) -> Result<Vec<Recipe>> {
        let Some(query) = ListQuery::build(filter, viewer_id) else {
            return Ok(Vec::new());
        };

        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_recipes_sqlite(sqlite(&self.pool)?, &query).await,
            DatabaseDriver::Mysql => list_recipes_mysql(mysql(&self.pool)?, &query).await,
        }
    }

    async fn list_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<Recipe>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_recipes_by_author_sqlite(sqlite(&self.pool)?, author_id, limit).await
            }
            DatabaseDriver::Mysql => {
                list_recipes_by_author_mysql(mysql(&self.pool)?, author_id, limit).await
            }
        }
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_recipes_by_author_sqlite(sqlite(&self.pool)?, author_id).await,
            DatabaseDriver::Mysql => count_recipes_by_author_mysql(mysql(&self.pool)?, author_id).await,
        }
    }

    async fn get_ingredients(&self, recipe_id: i64) -> Result<Vec<IngredientAmount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_recipe_ingredients_sqlite(sqlite(&self.pool)?, recipe_id).await
            }
            DatabaseDriver::Mysql => {
                get_recipe_ingredients_mysql(mysql(&self.pool)?, recipe_id).await
            }
        }
    }
}

/// Bound value of a dynamically built list query
#[derive(Debug, Clone, PartialEq)]
enum ListBind {
    Int(i64),
    Text(String),
}

/// SQL and binds for a filtered recipe list, shared by both drivers
#[derive(Debug)]
struct ListQuery {
    sql: String,
    binds: Vec<ListBind>,
}

impl ListQuery {
    /// Returns `None` when the filter can match nothing, i.e. it asks for
    /// favorites or cart contents without a viewer.
    fn build(filter: &RecipeFilter, viewer_id: Option<i64>) -> Option<Self> {
        let mut sql = format!("SELECT {} FROM recipes r WHERE 1 = 1", RECIPE_COLUMNS);
        let mut binds = Vec::new();

        if !filter.tags.is_empty() {
            sql.push_str(&format!(
                " AND r.id IN (SELECT rt.recipe_id FROM recipe_tags rt \
                 INNER JOIN tags t ON t.id = rt.tag_id WHERE t.slug IN ({}))",
                placeholders(filter.tags.len())
            ));
            binds.extend(filter.tags.iter().cloned().map(ListBind::Text));
        }

        if !filter.author.is_empty() {
            sql.push_str(&format!(
                " AND r.author_id IN ({})",
                placeholders(filter.author.len())
            ));
            binds.extend(filter.author.iter().copied().map(ListBind::Int));
        }

        for (enabled, table) in [
            (filter.is_favorited, "favorites"),
            (filter.is_in_shopping_cart, "shopping_cart"),
        ] {
            if enabled {
                let viewer_id = viewer_id?;
                sql.push_str(&format!(
                    " AND r.id IN (SELECT recipe_id FROM {} WHERE user_id = ?)",
                    table
                ));
                binds.push(ListBind::Int(viewer_id));
            }
        }

        sql.push_str(" ORDER BY r.created_at DESC, r.id DESC");
        Some(Self { sql, binds })
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_recipe_sqlite(pool: &SqlitePool, author_id: i64, input: &RecipeInput) -> Result<Recipe> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;

    let id = result.last_insert_rowid();
    insert_composition_sqlite(&mut tx, id, input).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: input.name.clone(),
        image: input.image.clone(),
        text: input.text.clone(),
        cooking_time: input.cooking_time,
        created_at: now,
        updated_at: now,
    })
}

async fn update_recipe_sqlite(pool: &SqlitePool, id: i64, input: &RecipeInput) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        UPDATE recipes
        SET name = ?, image = COALESCE(?, image), text = ?, cooking_time = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;
    insert_composition_sqlite(&mut tx, id, input).await?;

    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload recipe")?;
    let recipe = row_to_recipe_sqlite(&row);

    tx.commit().await.context("Failed to commit recipe")?;
    Ok(Some(recipe))
}

async fn insert_composition_sqlite(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    input: &RecipeInput,
) -> Result<()> {
    for tag_id in &input.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(*tag_id)
            .execute(&mut **tx)
            .await
            .context("Failed to add tag to recipe")?;
    }

    for item in &input.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut **tx)
        .await
        .context("Failed to add ingredient to recipe")?;
    }

    Ok(())
}

async fn delete_recipe_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    // Composition, favorites and cart rows cascade
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?;

    Ok(result.rows_affected() > 0)
}

async fn get_recipe_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_sqlite))
}

async fn list_recipes_sqlite(pool: &SqlitePool, list: &ListQuery) -> Result<Vec<Recipe>> {
    let mut query = sqlx::query(&list.sql);
    for bind in &list.binds {
        query = match bind {
            ListBind::Int(value) => query.bind(*value),
            ListBind::Text(value) => query.bind(value.clone()),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    Ok(rows.iter().map(row_to_recipe_sqlite).collect())
}

async fn list_recipes_by_author_sqlite(
    pool: &SqlitePool,
    author_id: i64,
    limit: Option<i64>,
) -> Result<Vec<Recipe>> {
    let mut sql = format!(
        "SELECT {} FROM recipes r WHERE r.author_id = ? ORDER BY r.created_at DESC, r.id DESC",
        RECIPE_COLUMNS
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql).bind(author_id);
    if let Some(limit) = limit {
        query = query.bind(limit);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list recipes by author")?;

    Ok(rows.iter().map(row_to_recipe_sqlite).collect())
}

async fn count_recipes_by_author_sqlite(pool: &SqlitePool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM recipes WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count recipes by author")?;

    Ok(row.get("count"))
}

async fn get_recipe_ingredients_sqlite(pool: &SqlitePool, recipe_id: i64) -> Result<Vec<IngredientAmount>> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY ri.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get recipe ingredients")?;

    Ok(rows
        .iter()
        .map(|row| IngredientAmount {
            id: row.get("id"),
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            amount: row.get("amount"),
        })
        .collect())
}

fn row_to_recipe_sqlite(row: &sqlx::sqlite::SqliteRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_recipe_mysql(pool: &MySqlPool, author_id: i64, input: &RecipeInput) -> Result<Recipe> {
    let now = Utc::now();
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO recipes (author_id, name, image, text, cooking_time, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(author_id)
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .context("Failed to create recipe")?;

    let id = result.last_insert_id() as i64;
    insert_composition_mysql(&mut tx, id, input).await?;
    tx.commit().await.context("Failed to commit recipe")?;

    Ok(Recipe {
        id,
        author_id,
        name: input.name.clone(),
        image: input.image.clone(),
        text: input.text.clone(),
        cooking_time: input.cooking_time,
        created_at: now,
        updated_at: now,
    })
}

async fn update_recipe_mysql(pool: &MySqlPool, id: i64, input: &RecipeInput) -> Result<Option<Recipe>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    // MySQL reports changed rows only, so existence is checked with a lock
    let exists = sqlx::query("SELECT id FROM recipes WHERE id = ? FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock recipe")?;
    if exists.is_none() {
        return Ok(None);
    }

    sqlx::query(
        r#"
        UPDATE recipes
        SET name = ?, image = COALESCE(?, image), text = ?, cooking_time = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.name)
    .bind(&input.image)
    .bind(&input.text)
    .bind(input.cooking_time)
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await
    .context("Failed to update recipe")?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe tags")?;
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear recipe ingredients")?;
    insert_composition_mysql(&mut tx, id, input).await?;

    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to reload recipe")?;
    let recipe = row_to_recipe_mysql(&row);

    tx.commit().await.context("Failed to commit recipe")?;
    Ok(Some(recipe))
}

async fn insert_composition_mysql(
    tx: &mut Transaction<'_, MySql>,
    recipe_id: i64,
    input: &RecipeInput,
) -> Result<()> {
    for tag_id in &input.tags {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?, ?)")
            .bind(recipe_id)
            .bind(*tag_id)
            .execute(&mut **tx)
            .await
            .context("Failed to add tag to recipe")?;
    }

    for item in &input.ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(item.id)
        .bind(item.amount)
        .execute(&mut **tx)
        .await
        .context("Failed to add ingredient to recipe")?;
    }

    Ok(())
}

async fn delete_recipe_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    // Composition, favorites and cart rows cascade
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete recipe")?;

    Ok(result.rows_affected() > 0)
}

async fn get_recipe_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Recipe>> {
    let row = sqlx::query(&format!("SELECT {} FROM recipes r WHERE r.id = ?", RECIPE_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get recipe by ID")?;

    Ok(row.as_ref().map(row_to_recipe_mysql))
}

async fn list_recipes_mysql(pool: &MySqlPool, list: &ListQuery) -> Result<Vec<Recipe>> {
    let mut query = sqlx::query(&list.sql);
    for bind in &list.binds {
        query = match bind {
            ListBind::Int(value) => query.bind(*value),
            ListBind::Text(value) => query.bind(value.clone()),
        };
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list recipes")?;

    Ok(rows.iter().map(row_to_recipe_mysql).collect())
}

async fn list_recipes_by_author_mysql(
    pool: &MySqlPool,
    author_id: i64,
    limit: Option<i64>,
) -> Result<Vec<Recipe>> {
    let mut sql = format!(
        "SELECT {} FROM recipes r WHERE r.author_id = ? ORDER BY r.created_at DESC, r.id DESC",
        RECIPE_COLUMNS
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql).bind(author_id);
    if let Some(limit) = limit {
        query = query.bind(limit);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list recipes by author")?;

    Ok(rows.iter().map(row_to_recipe_mysql).collect())
}

async fn count_recipes_by_author_mysql(pool: &MySqlPool, author_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM recipes WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .context("Failed to count recipes by author")?;

    Ok(row.get("count"))
}

async fn get_recipe_ingredients_mysql(pool: &MySqlPool, recipe_id: i64) -> Result<Vec<IngredientAmount>> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.name, i.measurement_unit, ri.amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY ri.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get recipe ingredients")?;

    Ok(rows
        .iter()
        .map(|row| IngredientAmount {
            id: row.get("id"),
            name: row.get("name"),
            measurement_unit: row.get("measurement_unit"),
            amount: row.get("amount"),
        })
        .collect())
}

fn row_to_recipe_mysql(row: &sqlx::mysql::MySqlRow) -> Recipe {
    Recipe {
        id: row.get("id"),
        author_id: row.get("author_id"),
        name: row.get("name"),
        image: row.get("image"),
        text: row.get("text"),
        cooking_time: row.get("cooking_time"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
