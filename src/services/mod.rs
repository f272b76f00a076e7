//! Services layer - Business logic
//!
//! This module contains the business logic of the recipe backend.
//! Services are responsible for:
//! - Implementing business rules and permission checks
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod ingredient;
pub mod recipe;
pub mod relation;
pub mod shopping_list;
pub mod subscription;
pub mod tag;
pub mod user;

pub use ingredient::{IngredientService, IngredientServiceError};
pub use recipe::{validate_composition, RecipeService, RecipeServiceError};
pub use relation::{RelationService, RelationServiceError};
pub use shopping_list::{ShoppingListService, ShoppingListServiceError};
pub use subscription::{SubscriptionService, SubscriptionServiceError};
pub use tag::{is_valid_color, TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
