//! Relation toggle service
//!
//! Add and remove operations for a user's favorites and shopping cart.
//! Repeating an add is a conflict, not a no-op; removing a missing row is
//! not found. The target recipe is checked first, so a missing recipe is
//! always reported as such regardless of relation state.

use crate::db::repositories::{AddRelation, RecipeRepository, RelationRepository};
use crate::models::{RelationKind, RelationRow};
use anyhow::Context;
use std::sync::Arc;

/// Error types for relation toggles
#[derive(Debug, thiserror::Error)]
pub enum RelationServiceError {
    /// Recipe or relation row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The relation already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Service toggling favorite and shopping cart rows
pub struct RelationService {
    relation_repo: Arc<dyn RelationRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
}

impl RelationService {
    /// Create a new relation service
    pub fn new(
        relation_repo: Arc<dyn RelationRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            relation_repo,
            recipe_repo,
        }
    }

    /// Add a recipe to one of the user's lists
    ///
    /// # Errors
    /// - `NotFound` if the recipe doesn't exist
    /// - `Conflict` if the recipe is already in the list
    pub async fn add(
        &self,
        kind: RelationKind,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<RelationRow, RelationServiceError> {
        self.ensure_recipe_exists(recipe_id).await?;

        let row = self
            .relation_repo
            .add(kind, user_id, recipe_id)
            .await
            .context("Failed to add relation")?;

        match row {
            AddRelation::Added(row) => {
                tracing::info!("User {} added recipe {} to {}", user_id, recipe_id, kind.label());
                Ok(row)
            }
            AddRelation::AlreadyExists => {
                tracing::warn!(
                    "User {} tried to add recipe {} to {} twice",
                    user_id,
                    recipe_id,
                    kind.label()
                );
                Err(RelationServiceError::Conflict(format!(
                    "Recipe {} is already in {}",
                    recipe_id,
                    kind.label()
                )))
            }
            AddRelation::MissingTarget => {
                tracing::warn!(
                    "Recipe {} disappeared before user {} could add it to {}",
                    recipe_id,
                    user_id,
                    kind.label()
                );
                Err(RelationServiceError::NotFound(format!(
                    "Recipe with ID {} not found",
                    recipe_id
                )))
            }
        }
    }

    /// Remove a recipe from one of the user's lists
    ///
    /// # Errors
    /// - `NotFound` if the recipe doesn't exist or is not in the list
    pub async fn remove(
        &self,
        kind: RelationKind,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<(), RelationServiceError> {
        self.ensure_recipe_exists(recipe_id).await?;

        let removed = self
            .relation_repo
            .remove(kind, user_id, recipe_id)
            .await
            .context("Failed to remove relation")?;

        if !removed {
            return Err(RelationServiceError::NotFound(format!(
                "Recipe {} is not in {}",
                recipe_id,
                kind.label()
            )));
        }

        tracing::info!("User {} removed recipe {} from {}", user_id, recipe_id, kind.label());
        Ok(())
    }

    async fn ensure_recipe_exists(&self, recipe_id: i64) -> Result<(), RelationServiceError> {
        self.recipe_repo
            .get_by_id(recipe_id)
            .await
            .context("Failed to get recipe")?
            .map(|_| ())
            .ok_or_else(|| {
                RelationServiceError::NotFound(format!("Recipe with ID {} not found", recipe_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxRecipeRepository, SqlxRelationRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use proptest::prelude::*;

    async fn setup_test_service() -> (DynDatabasePool, RelationService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        for sql in [
            "INSERT INTO users (username, email) VALUES ('cook', 'cook@example.com')",
            "INSERT INTO users (username, email) VALUES ('eater', 'eater@example.com')",
            "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (1, 'Soup', 'Boil', 30)",
        ] {
            pool.execute(sql).await.unwrap();
        }

        let service = RelationService::new(
            SqlxRelationRepository::boxed(pool.clone()),
            SqlxRecipeRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    async fn count_rows(pool: &DynDatabasePool, kind: RelationKind) -> i64 {
        use sqlx::Row;
        sqlx::query(&format!("SELECT COUNT(*) AS count FROM {}", kind.table()))
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
            .get("count")
    }

    #[tokio::test]
    async fn test_add_twice_conflicts() {
        let (pool, service) = setup_test_service().await;

        let row = service.add(RelationKind::Favorite, 2, 1).await.unwrap();
        assert_eq!(row.kind, RelationKind::Favorite);
        assert_eq!(row.user_id, 2);
        assert_eq!(row.recipe_id, 1);

        let again = service.add(RelationKind::Favorite, 2, 1).await;
        assert!(matches!(again, Err(RelationServiceError::Conflict(_))));
        assert_eq!(count_rows(&pool, RelationKind::Favorite).await, 1);
    }

    #[tokio::test]
    async fn test_remove_absent_is_not_found() {
        let (_pool, service) = setup_test_service().await;

        let result = service.remove(RelationKind::ShoppingCart, 2, 1).await;
        assert!(matches!(result, Err(RelationServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_missing_recipe_is_checked_first() {
        let (_pool, service) = setup_test_service().await;

        let add = service.add(RelationKind::ShoppingCart, 2, 99).await;
        assert!(matches!(add, Err(RelationServiceError::NotFound(msg)) if msg.contains("99")));

        let remove = service.remove(RelationKind::Favorite, 2, 99).await;
        assert!(matches!(remove, Err(RelationServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recipe_deleted_before_insert_is_not_found() {
        let (pool, _) = setup_test_service().await;

        // The existence check sees the recipe, the insert target no longer has it.
        let stale = setup_test_service().await.0;
        let service = RelationService::new(
            SqlxRelationRepository::boxed(pool.clone()),
            SqlxRecipeRepository::boxed(stale),
        );
        pool.execute("DELETE FROM recipes WHERE id = 1").await.unwrap();

        let add = service.add(RelationKind::Favorite, 2, 1).await;
        assert!(matches!(add, Err(RelationServiceError::NotFound(msg)) if msg.contains('1')));
        assert_eq!(count_rows(&pool, RelationKind::Favorite).await, 0);
    }

    #[tokio::test]
    async fn test_remove_then_readd_restores_state() {
        let (pool, service) = setup_test_service().await;

        let first = service.add(RelationKind::Favorite, 2, 1).await.unwrap();
        service.remove(RelationKind::Favorite, 2, 1).await.unwrap();
        assert_eq!(count_rows(&pool, RelationKind::Favorite).await, 0);

        let second = service.add(RelationKind::Favorite, 2, 1).await.unwrap();
        assert_eq!((second.kind, second.user_id, second.recipe_id), (first.kind, first.user_id, first.recipe_id));
        assert_eq!(count_rows(&pool, RelationKind::Favorite).await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_adds_leave_one_row() {
        let (pool, service) = setup_test_service().await;
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.add(RelationKind::ShoppingCart, 2, 1).await })
            })
            .collect();

        let mut created = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RelationServiceError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("Unexpected error: {}", other),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(count_rows(&pool, RelationKind::ShoppingCart).await, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any sequence of toggles leaves the row present exactly when the
        /// last successful operation was an add.
        #[test]
        fn property_toggle_sequence_matches_model(
            ops in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..12)
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let (pool, service) = setup_test_service().await;
                let mut favorite = false;
                let mut in_cart = false;

                for (is_add, is_favorite) in ops {
                    let (kind, present) = if is_favorite {
                        (RelationKind::Favorite, &mut favorite)
                    } else {
                        (RelationKind::ShoppingCart, &mut in_cart)
                    };

                    if is_add {
                        let result = service.add(kind, 2, 1).await;
                        prop_assert_eq!(result.is_ok(), !*present);
                        if !*present {
                            *present = true;
                        } else {
                            prop_assert!(matches!(result, Err(RelationServiceError::Conflict(_))));
                        }
                    } else {
                        let result = service.remove(kind, 2, 1).await;
                        prop_assert_eq!(result.is_ok(), *present);
                        if *present {
                            *present = false;
                        } else {
                            prop_assert!(matches!(result, Err(RelationServiceError::NotFound(_))));
                        }
                    }
                }

                prop_assert_eq!(count_rows(&pool, RelationKind::Favorite).await, favorite as i64);
                prop_assert_eq!(count_rows(&pool, RelationKind::ShoppingCart).await, in_cart as i64);
                Ok(())
            });
            result?;
        }
    }
}
