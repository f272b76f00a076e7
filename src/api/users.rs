//! User API endpoints
//!
//! Handles HTTP requests for profiles and subscriptions:
//! - POST /api/users - Register a user
//! - GET /api/users - List profiles
//! - GET /api/users/me - Current user's profile
//! - GET /api/users/{id} - Profile by id
//! - GET /api/users/subscriptions - Followed authors with recipe previews
//! - POST|DELETE /api/users/{id}/subscribe - Follow or unfollow an author

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser, OptionalUser};
use crate::models::{CreateUserInput, SubscriptionView, User, UserProfile};

/// Query parameters for subscription views
#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimitQuery {
    /// Maximum recipes shown per author
    pub recipes_limit: Option<i64>,
}

/// Response for a newly registered user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Build the users router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register))
        .route("/me", get(me))
        .route("/subscriptions", get(subscriptions))
        .route("/{id}", get(get_user))
        .route("/{id}/subscribe", post(subscribe).delete(unsubscribe))
}

/// POST /api/users - Register a user
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.user_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /api/users - List profiles
async fn list_users(
    State(state): State<AppState>,
    viewer: OptionalUser,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.user_service.list(viewer.user()).await?;
    Ok(Json(users))
}

/// GET /api/users/me - Current user's profile
async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> Json<UserProfile> {
    Json(state.user_service.me(&user.0))
}

/// GET /api/users/{id} - Profile by id
async fn get_user(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.user_service.get_profile(viewer.user(), id).await?;
    Ok(Json(profile))
}

/// GET /api/users/subscriptions - Followed authors
async fn subscriptions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<Json<Vec<SubscriptionView>>, ApiError> {
    let views = state
        .subscription_service
        .subscriptions(&user.0, query.recipes_limit)
        .await?;
    Ok(Json(views))
}

/// POST /api/users/{id}/subscribe - Follow an author
async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(author_id): Path<i64>,
    Query(query): Query<RecipesLimitQuery>,
) -> Result<(StatusCode, Json<SubscriptionView>), ApiError> {
    state.subscription_service.subscribe(&user.0, author_id).await?;
    let view = state
        .subscription_service
        .view(&user.0, author_id, query.recipes_limit)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/users/{id}/subscribe - Unfollow an author
async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(author_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.subscription_service.unsubscribe(&user.0, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
