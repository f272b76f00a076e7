//! Subscription service
//!
//! Follow and unfollow authors, and list followed authors with a preview
//! of their newest recipes.

use crate::db::repositories::{RecipeRepository, SubscriptionRepository, UserRepository};
use crate::models::{
    RecipeShort, Subscription, SubscriptionView, User, UserProfile, ValidationErrors,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for subscription operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    /// Author or subscription not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to follow oneself
    #[error("You cannot subscribe to yourself")]
    SelfReferenceRejected,

    /// Already subscribed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(ValidationErrors),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Subscription service
pub struct SubscriptionService {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    user_repo: Arc<dyn UserRepository>,
    recipe_repo: Arc<dyn RecipeRepository>,
}

impl SubscriptionService {
    /// Create a new subscription service
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        user_repo: Arc<dyn UserRepository>,
        recipe_repo: Arc<dyn RecipeRepository>,
    ) -> Self {
        Self {
            subscription_repo,
            user_repo,
            recipe_repo,
        }
    }

    /// Follow an author
    ///
    /// Self-subscription is rejected before anything else is checked.
    ///
    /// # Errors
    /// - `SelfReferenceRejected` if `author_id` is the user
    /// - `NotFound` if the author doesn't exist
    /// - `Conflict` if already subscribed
    pub async fn subscribe(
        &self,
        user: &User,
        author_id: i64,
    ) -> Result<Subscription, SubscriptionServiceError> {
        if user.id == author_id {
            tracing::warn!("User {} tried to subscribe to themselves", user.id);
            return Err(SubscriptionServiceError::SelfReferenceRejected);
        }

        self.get_author(author_id).await?;

        let subscription = self
            .subscription_repo
            .create(user.id, author_id)
            .await
            .context("Failed to create subscription")?;

        match subscription {
            Some(subscription) => {
                tracing::info!("User {} subscribed to {}", user.id, author_id);
                Ok(subscription)
            }
            None => {
                tracing::warn!("User {} is already subscribed to {}", user.id, author_id);
                Err(SubscriptionServiceError::Conflict(format!(
                    "Already subscribed to user {}",
                    author_id
                )))
            }
        }
    }

    /// Unfollow an author
    ///
    /// # Errors
    /// - `NotFound` if the author doesn't exist or isn't followed
    pub async fn unsubscribe(
        &self,
        user: &User,
        author_id: i64,
    ) -> Result<(), SubscriptionServiceError> {
        self.get_author(author_id).await?;

        let deleted = self
            .subscription_repo
            .delete(user.id, author_id)
            .await
            .context("Failed to delete subscription")?;

        if !deleted {
            return Err(SubscriptionServiceError::NotFound(format!(
                "Not subscribed to user {}",
                author_id
            )));
        }

        tracing::info!("User {} unsubscribed from {}", user.id, author_id);
        Ok(())
    }

    /// Authors followed by `user`, each with up to `recipes_limit` recipes
    pub async fn subscriptions(
        &self,
        user: &User,
        recipes_limit: Option<i64>,
    ) -> Result<Vec<SubscriptionView>, SubscriptionServiceError> {
        check_limit(recipes_limit)?;

        let author_ids = self
            .subscription_repo
            .author_ids(user.id)
            .await
            .context("Failed to list subscriptions")?;

        let mut views = Vec::with_capacity(author_ids.len());
        for author_id in author_ids {
            let author = self.get_author(author_id).await?;
            views.push(self.build_view(author, true, recipes_limit).await?);
        }

        Ok(views)
    }

    /// One author as seen from `viewer`'s subscriptions page
    pub async fn view(
        &self,
        viewer: &User,
        author_id: i64,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionView, SubscriptionServiceError> {
        check_limit(recipes_limit)?;

        let author = self.get_author(author_id).await?;
        let is_subscribed = self
            .subscription_repo
            .exists(viewer.id, author_id)
            .await
            .context("Failed to check subscription")?;

        self.build_view(author, is_subscribed, recipes_limit).await
    }

    async fn get_author(&self, author_id: i64) -> Result<User, SubscriptionServiceError> {
        self.user_repo
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| {
                SubscriptionServiceError::NotFound(format!("User with ID {} not found", author_id))
            })
    }

    async fn build_view(
        &self,
        author: User,
        is_subscribed: bool,
        recipes_limit: Option<i64>,
    ) -> Result<SubscriptionView, SubscriptionServiceError> {
        let recipes = self
            .recipe_repo
            .list_by_author(author.id, recipes_limit)
            .await
            .context("Failed to list author recipes")?;
        let recipes_count = self
            .recipe_repo
            .count_by_author(author.id)
            .await
            .context("Failed to count author recipes")?;

        Ok(SubscriptionView {
            author: UserProfile::from_user(author, is_subscribed),
            recipes: recipes.iter().map(RecipeShort::from).collect(),
            recipes_count,
        })
    }
}

fn check_limit(recipes_limit: Option<i64>) -> Result<(), SubscriptionServiceError> {
    match recipes_limit {
        Some(limit) if limit < 0 => Err(SubscriptionServiceError::ValidationError(
            ValidationErrors::single("recipes_limit", "Ensure this value is greater than or equal to 0."),
        )),
        _ => Ok(()),
    }
}
