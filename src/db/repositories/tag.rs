//! Tag repository
//!
//! Database operations for tags.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL

use super::placeholders;
use crate::config::DatabaseDriver;
use crate::db::{is_unique_violation, mysql, sqlite, DynDatabasePool};
use crate::models::{CreateTagInput, Tag};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag.
    ///
    /// Returns `None` when the name, color or slug is already taken.
    async fn create(&self, input: &CreateTagInput) -> Result<Option<Tag>>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// Get every existing tag among `ids`
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// Get tags for a recipe
    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DynDatabasePool,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, input: &CreateTagInput) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(sqlite(&self.pool)?, input).await,
            DatabaseDriver::Mysql => create_tag_mysql(mysql(&self.pool)?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_id_sqlite(sqlite(&self.pool)?, id).await,
            DatabaseDriver::Mysql => get_tag_by_id_mysql(mysql(&self.pool)?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tag_by_slug_sqlite(sqlite(&self.pool)?, slug).await,
            DatabaseDriver::Mysql => get_tag_by_slug_mysql(mysql(&self.pool)?, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_tags_sqlite(sqlite(&self.pool)?).await,
            DatabaseDriver::Mysql => list_tags_mysql(mysql(&self.pool)?).await,
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_tags_by_ids_sqlite(sqlite(&self.pool)?, ids).await,
            DatabaseDriver::Mysql => get_tags_by_ids_mysql(mysql(&self.pool)?, ids).await,
        }
    }

    async fn get_by_recipe_id(&self, recipe_id: i64) -> Result<Vec<Tag>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_tags_by_recipe_sqlite(sqlite(&self.pool)?, recipe_id).await
            }
            DatabaseDriver::Mysql => get_tags_by_recipe_mysql(mysql(&self.pool)?, recipe_id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, input: &CreateTagInput) -> Result<Option<Tag>> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(Some(Tag {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            color: input.color.clone(),
            slug: input.slug.clone(),
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create tag"),
    }
}

async fn get_tag_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn get_tag_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.as_ref().map(row_to_tag_sqlite))
}

async fn list_tags_sqlite(pool: &SqlitePool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_tags_by_ids_sqlite(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE id IN ({}) ORDER BY name",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

async fn get_tags_by_recipe_sqlite(pool: &SqlitePool, recipe_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM tags t
        INNER JOIN recipe_tags rt ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for recipe")?;

    Ok(rows.iter().map(row_to_tag_sqlite).collect())
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, input: &CreateTagInput) -> Result<Option<Tag>> {
    let result = sqlx::query("INSERT INTO tags (name, color, slug) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.color)
        .bind(&input.slug)
        .execute(pool)
        .await;

    match result {
        Ok(result) => Ok(Some(Tag {
            id: result.last_insert_id() as i64,
            name: input.name.clone(),
            color: input.color.clone(),
            slug: input.slug.clone(),
        })),
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err).context("Failed to create tag"),
    }
}

async fn get_tag_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by ID")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn get_tag_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Tag>> {
    let row = sqlx::query("SELECT id, name, color, slug FROM tags WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get tag by slug")?;

    Ok(row.as_ref().map(row_to_tag_mysql))
}

async fn list_tags_mysql(pool: &MySqlPool) -> Result<Vec<Tag>> {
    let rows = sqlx::query("SELECT id, name, color, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .context("Failed to list tags")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_tags_by_ids_mysql(pool: &MySqlPool, ids: &[i64]) -> Result<Vec<Tag>> {
    let sql = format!(
        "SELECT id, name, color, slug FROM tags WHERE id IN ({}) ORDER BY name",
        placeholders(ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(*id);
    }

    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get tags by IDs")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

async fn get_tags_by_recipe_mysql(pool: &MySqlPool, recipe_id: i64) -> Result<Vec<Tag>> {
    let rows = sqlx::query(
        r#"
        SELECT t.id, t.name, t.color, t.slug
        FROM tags t
        INNER JOIN recipe_tags rt ON t.id = rt.tag_id
        WHERE rt.recipe_id = ?
        ORDER BY t.name
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .context("Failed to get tags for recipe")?;

    Ok(rows.iter().map(row_to_tag_mysql).collect())
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        slug: row.get("slug"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> SqlxTagRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool).await.expect("Failed to run migrations");
        SqlxTagRepository::new(pool)
    }

    #[tokio::test]
    async fn test_create_and_get_tag() {
        let repo = setup().await;

        let tag = repo
            .create(&CreateTagInput::new("Breakfast", "#E26C2D", "breakfast"))
            .await
            .unwrap()
            .unwrap();
        assert!(tag.id > 0);

        assert_eq!(repo.get_by_id(tag.id).await.unwrap(), Some(tag.clone()));
        assert_eq!(repo.get_by_slug("breakfast").await.unwrap(), Some(tag));
        assert!(repo.get_by_slug("dinner").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_fields_return_none() {
        let repo = setup().await;
        repo.create(&CreateTagInput::new("Lunch", "#49B64E", "lunch"))
            .await
            .unwrap()
            .unwrap();

        let same_slug = CreateTagInput::new("Brunch", "#000000", "lunch");
        assert!(repo.create(&same_slug).await.unwrap().is_none());

        let same_color = CreateTagInput::new("Supper", "#49B64E", "supper");
        assert!(repo.create(&same_color).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_missing() {
        let repo = setup().await;
        let a = repo
            .create(&CreateTagInput::new("A", "#111111", "a"))
            .await
            .unwrap()
            .unwrap();
        let b = repo
            .create(&CreateTagInput::new("B", "#222222", "b"))
            .await
            .unwrap()
            .unwrap();

        let tags = repo.get_by_ids(&[b.id, 404, a.id]).await.unwrap();
        assert_eq!(tags, vec![a, b]);
        assert!(repo.get_by_ids(&[]).await.unwrap().is_empty());
    }
}
