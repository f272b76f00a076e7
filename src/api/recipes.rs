//! Recipe API endpoints
//!
//! Handles HTTP requests for the recipe catalogue:
//! - GET /api/recipes - List recipes (filters: tags, author, is_favorited, is_in_shopping_cart)
//! - POST /api/recipes - Create a recipe
//! - GET|PATCH|DELETE /api/recipes/{id} - Read, replace or delete a recipe
//! - POST|DELETE /api/recipes/{id}/favorite - Toggle a favorite
//! - POST|DELETE /api/recipes/{id}/shopping_cart - Toggle a cart entry
//! - GET /api/recipes/download_shopping_cart - Shopping list as a text file

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{Query, QueryRejection};
use chrono::Utc;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, OptionalUser};
use crate::models::{
    RecipeDetail, RecipeFilter, RecipeInput, RecipeShort, RelationKind, ValidationErrors,
};

/// Build the recipes router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route(
            "/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route("/{id}/favorite", post(add_favorite).delete(remove_favorite))
        .route(
            "/{id}/shopping_cart",
            post(add_to_shopping_cart).delete(remove_from_shopping_cart),
        )
}

/// GET /api/recipes - List recipes, newest first
///
/// Repeated `tags` and `author` parameters match any of the values.
async fn list_recipes(
    State(state): State<AppState>,
    viewer: OptionalUser,
    query: Result<Query<RecipeFilter>, QueryRejection>,
) -> Result<Json<Vec<RecipeDetail>>, ApiError> {
    let Query(filter) = query.map_err(|rejection| {
        tracing::warn!("Rejected recipe filter: {}", rejection);
        ApiError::validation(ValidationErrors::single("query", rejection.to_string()))
    })?;
    let recipes = state.recipe_service.list(viewer.user(), &filter).await?;
    Ok(Json(recipes))
}

/// POST /api/recipes - Create a recipe
async fn create_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<RecipeInput>,
) -> Result<(StatusCode, Json<RecipeDetail>), ApiError> {
    let recipe = state.recipe_service.create(&user.0, body).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// GET /api/recipes/{id} - Get a recipe
async fn get_recipe(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state.recipe_service.get(viewer.user(), id).await?;
    Ok(Json(recipe))
}

/// PATCH /api/recipes/{id} - Replace a recipe
///
/// Only the author or an admin may update. Tags and ingredients are
/// replaced as a whole.
async fn update_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RecipeInput>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = state.recipe_service.update(&user.0, id, body).await?;
    Ok(Json(recipe))
}

/// DELETE /api/recipes/{id} - Delete a recipe
async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipe_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_relation(
    state: &AppState,
    kind: RelationKind,
    user: &AuthenticatedUser,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    state.relation_service.add(kind, user.0.id, recipe_id).await?;
    let recipe = state.recipe_service.get_short(recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_relation(
    state: &AppState,
    kind: RelationKind,
    user: &AuthenticatedUser,
    recipe_id: i64,
) -> Result<StatusCode, ApiError> {
    state.relation_service.remove(kind, user.0.id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipes/{id}/favorite
async fn add_favorite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_relation(&state, RelationKind::Favorite, &user, id).await
}

/// DELETE /api/recipes/{id}/favorite
async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_relation(&state, RelationKind::Favorite, &user, id).await
}

/// POST /api/recipes/{id}/shopping_cart
async fn add_to_shopping_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<RecipeShort>), ApiError> {
    add_relation(&state, RelationKind::ShoppingCart, &user, id).await
}

/// DELETE /api/recipes/{id}/shopping_cart
async fn remove_from_shopping_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    remove_relation(&state, RelationKind::ShoppingCart, &user, id).await
}

/// GET /api/recipes/download_shopping_cart - Shopping list attachment
async fn download_shopping_cart(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let body = state.shopping_list_service.render(user.0.id).await?;
    let filename = format!("{}_shopping_list.txt", Utc::now().format("%Y-%m-%d"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        body,
    ))
}
