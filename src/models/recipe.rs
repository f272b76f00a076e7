//! Recipe model
//!
//! A recipe belongs to its author and is composed of tags and ingredient
//! rows with amounts. Read views carry per-viewer flags that are computed
//! at read time, never stored.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{Tag, UserProfile};

/// Recipe entity as stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: i64,
    /// Owner, recipes are deleted with their author
    pub author_id: i64,
    pub name: String,
    /// Opaque blob store reference
    pub image: Option<String>,
    pub text: String,
    /// Minutes, at least 1
    pub cooking_time: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One ingredient line of a recipe write request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredientInput {
    /// Ingredient id
    pub id: i64,
    pub amount: i64,
}

impl RecipeIngredientInput {
    pub fn new(id: i64, amount: i64) -> Self {
        Self { id, amount }
    }
}

/// Input for creating or updating a recipe.
///
/// Update is a full replace of tags and ingredients. Missing fields
/// deserialize to empty values so that validation can report all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeInput {
    pub tags: Vec<i64>,
    pub ingredients: Vec<RecipeIngredientInput>,
    pub name: String,
    /// Replaced only when supplied
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i64,
}

/// Ingredient with the amount used by one recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngredientAmount {
    /// Ingredient id
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Full recipe view for a particular viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetail {
    pub id: i64,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i64,
    pub created_at: DateTime<Utc>,
}

/// Compact recipe view used in relation responses and subscriptions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeShort {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i64,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Recipe list filter, read from the query string.
///
/// `tags` and `author` may repeat and match any of the given values. The
/// boolean flags restrict the list to the viewer's favorites or cart when
/// set. Unknown keys are ignored; malformed values are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecipeFilter {
    /// Tag slugs
    #[serde(deserialize_with = "non_blank")]
    pub tags: Vec<String>,
    /// Author ids
    pub author: Vec<i64>,
    #[serde(deserialize_with = "flag")]
    pub is_favorited: bool,
    #[serde(deserialize_with = "flag")]
    pub is_in_shopping_cart: bool,
}

fn non_blank<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<String>::deserialize(deserializer)?;
    Ok(values.into_iter().filter(|v| !v.trim().is_empty()).collect())
}

/// `1`/`true` and `0`/`false`, case-insensitive
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    match value.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "" | "0" | "false" => Ok(false),
        other => Err(de::Error::custom(format!("invalid flag value `{}`", other))),
    }
}
