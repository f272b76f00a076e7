//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations for a specific entity.

pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod shopping_list;
pub mod subscription;
pub mod tag;
pub mod user;

pub use ingredient::{IngredientRepository, SqlxIngredientRepository};
pub use recipe::{RecipeRepository, SqlxRecipeRepository};
pub use relation::{AddRelation, RelationRepository, SqlxRelationRepository};
pub use shopping_list::{ShoppingListRepository, SqlxShoppingListRepository};
pub use subscription::{SqlxSubscriptionRepository, SubscriptionRepository};
pub use tag::{SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Comma-separated `?` placeholders for an `IN (...)` list
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
