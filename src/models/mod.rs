//! Data models
//!
//! This module contains all data structures used throughout Foodgram.
//! Models represent:
//! - Database entities (User, Tag, Ingredient, Recipe, relation rows, Subscription)
//! - API request/response types
//! - Internal data transfer objects

mod ingredient;
mod recipe;
mod relation;
mod shopping_list;
mod subscription;
mod tag;
mod user;
mod validation;

pub use ingredient::{CreateIngredientInput, Ingredient};
pub use recipe::{
    IngredientAmount, Recipe, RecipeDetail, RecipeFilter, RecipeIngredientInput, RecipeInput,
    RecipeShort,
};
pub use relation::{RelationKind, RelationRow};
pub use shopping_list::{render_shopping_list, ShoppingListItem, SHOPPING_LIST_HEADER};
pub use subscription::{Subscription, SubscriptionView};
pub use tag::{CreateTagInput, Tag};
pub use user::{CreateUserInput, User, UserProfile, UserRole};
pub use validation::ValidationErrors;
