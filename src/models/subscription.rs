//! Subscription model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecipeShort, UserProfile};

/// A follower-to-author edge. Self-subscriptions never exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: i64,
    /// Follower
    pub user_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// An author as seen from the subscriptions page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserProfile,
    /// Newest recipes, possibly truncated
    pub recipes: Vec<RecipeShort>,
    /// Total number of recipes by the author
    pub recipes_count: i64,
}
