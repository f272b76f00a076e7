//! User-to-recipe relations
//!
//! Favorites and the shopping cart have the same shape: a unique
//! (user, recipe) pair. One row type covers both, tagged by kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which user-to-recipe relation a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
}

impl RelationKind {
    /// Backing table
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping_cart",
        }
    }

    /// Human-readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping cart",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationKind::Favorite => write!(f, "favorite"),
            RelationKind::ShoppingCart => write!(f, "shopping_cart"),
        }
    }
}

/// A user's relation to a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationRow {
    pub id: i64,
    pub kind: RelationKind,
    pub user_id: i64,
    pub recipe_id: i64,
    pub created_at: DateTime<Utc>,
}
