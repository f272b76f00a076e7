//! Ingredient API endpoints
//!
//! - GET /api/ingredients?name= - List ingredients, optionally by name prefix
//! - GET /api/ingredients/{id} - Get an ingredient

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::Ingredient;

/// Query parameters for ingredient search
#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}

/// Build the ingredients router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_ingredients))
        .route("/{id}", get(get_ingredient))
}

async fn list_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let ingredients = state
        .ingredient_service
        .list(query.name.as_deref())
        .await?;
    Ok(Json(ingredients))
}

async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Ingredient>, ApiError> {
    let ingredient = state.ingredient_service.get(id).await?;
    Ok(Json(ingredient))
}
