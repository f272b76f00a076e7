//! Tag API endpoints
//!
//! Tags are read-only over HTTP:
//! - GET /api/tags - List tags
//! - GET /api/tags/{id} - Get a tag

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::models::Tag;

/// Build the tags router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{id}", get(get_tag))
}

/// GET /api/tags - List tags ordered by name
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags))
}

/// GET /api/tags/{id} - Get a tag
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    let tag = state.tag_service.get(id).await?;
    Ok(Json(tag))
}
