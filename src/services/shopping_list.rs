//! Shopping list service
//!
//! Consolidates the ingredients of every recipe in a user's cart and
//! renders them as a plain-text list.

use crate::db::repositories::ShoppingListRepository;
use crate::models::{render_shopping_list, ShoppingListItem};
use anyhow::Context;
use std::sync::Arc;

/// Error types for shopping list operations
#[derive(Debug, thiserror::Error)]
pub enum ShoppingListServiceError {
    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Shopping list service
pub struct ShoppingListService {
    repo: Arc<dyn ShoppingListRepository>,
}

impl ShoppingListService {
    /// Create a new shopping list service
    pub fn new(repo: Arc<dyn ShoppingListRepository>) -> Self {
        Self { repo }
    }

    /// Ingredient totals over the user's cart, ordered by name
    pub async fn aggregate(&self, user_id: i64) -> Result<Vec<ShoppingListItem>, ShoppingListServiceError> {
        let items = self
            .repo
            .aggregate(user_id)
            .await
            .context("Failed to aggregate shopping list")?;
        Ok(items)
    }

    /// The user's shopping list as text
    pub async fn render(&self, user_id: i64) -> Result<String, ShoppingListServiceError> {
        let items = self.aggregate(user_id).await?;
        tracing::debug!("Rendering shopping list of {} items for user {}", items.len(), user_id);
        Ok(render_shopping_list(&items))
    }
}
