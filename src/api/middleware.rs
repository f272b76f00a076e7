//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and service error mapping
//! - Identity resolution from the trusted user id header
//! - Extractors for the current user

use anyhow::Context;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxIngredientRepository, SqlxRecipeRepository, SqlxRelationRepository,
    SqlxShoppingListRepository, SqlxSubscriptionRepository, SqlxTagRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{User, ValidationErrors};
use crate::services::{
    IngredientService, IngredientServiceError, RecipeService, RecipeServiceError,
    RelationService, RelationServiceError, ShoppingListService, ShoppingListServiceError,
    SubscriptionService, SubscriptionServiceError, TagService, TagServiceError, UserService,
    UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub ingredient_service: Arc<IngredientService>,
    pub recipe_service: Arc<RecipeService>,
    pub relation_service: Arc<RelationService>,
    pub subscription_service: Arc<SubscriptionService>,
    pub shopping_list_service: Arc<ShoppingListService>,
    /// Header carrying the authenticated user id
    pub user_header: HeaderName,
}

impl AppState {
    /// Wire repositories and services over a database pool
    pub fn new(pool: DynDatabasePool, config: &Config) -> anyhow::Result<Self> {
        let user_header = HeaderName::from_bytes(config.identity.user_header.trim().as_bytes())
            .with_context(|| {
                format!("Invalid identity header name: {}", config.identity.user_header)
            })?;

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        let ingredient_repo = SqlxIngredientRepository::boxed(pool.clone());
        let recipe_repo = SqlxRecipeRepository::boxed(pool.clone());
        let relation_repo = SqlxRelationRepository::boxed(pool.clone());
        let subscription_repo = SqlxSubscriptionRepository::boxed(pool.clone());
        let shopping_list_repo = SqlxShoppingListRepository::boxed(pool);
        let limits = config.limits.clone();

        Ok(Self {
            user_service: Arc::new(UserService::new(
                user_repo.clone(),
                subscription_repo.clone(),
                limits.clone(),
            )),
            tag_service: Arc::new(TagService::new(tag_repo.clone(), limits.clone())),
            ingredient_service: Arc::new(IngredientService::new(
                ingredient_repo.clone(),
                limits.clone(),
            )),
            recipe_service: Arc::new(RecipeService::new(
                recipe_repo.clone(),
                tag_repo,
                ingredient_repo,
                user_repo.clone(),
                relation_repo.clone(),
                subscription_repo.clone(),
                limits,
            )),
            relation_service: Arc::new(RelationService::new(relation_repo, recipe_repo.clone())),
            subscription_service: Arc::new(SubscriptionService::new(
                subscription_repo,
                user_repo,
                recipe_repo,
            )),
            shopping_list_service: Arc::new(ShoppingListService::new(shopping_list_repo)),
            user_header,
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// User resolved from the identity header, if any
#[derive(Debug, Clone)]
pub struct OptionalUser(pub Option<User>);

impl OptionalUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    /// Field-level validation failure
    pub fn validation(errors: ValidationErrors) -> Self {
        let message = errors.to_string();
        match serde_json::to_value(&errors) {
            Ok(details) => Self::with_details("VALIDATION_ERROR", message, details),
            Err(_) => Self::new("VALIDATION_ERROR", message),
        }
    }

    /// Log the cause and hide it from the client
    pub fn internal_error(err: anyhow::Error) -> Self {
        tracing::error!("Request failed: {:#}", err);
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

// ============================================================================
// Service error mapping
// ============================================================================

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound(msg) => ApiError::not_found(msg),
            UserServiceError::ValidationError(errors) => ApiError::validation(errors),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(msg) => ApiError::not_found(msg),
            TagServiceError::ValidationError(errors) => ApiError::validation(errors),
            TagServiceError::Conflict(msg) => ApiError::conflict(msg),
            TagServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<IngredientServiceError> for ApiError {
    fn from(err: IngredientServiceError) -> Self {
        match err {
            IngredientServiceError::NotFound(msg) => ApiError::not_found(msg),
            IngredientServiceError::ValidationError(errors) => ApiError::validation(errors),
            IngredientServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<RecipeServiceError> for ApiError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::NotFound(msg) => ApiError::not_found(msg),
            RecipeServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            RecipeServiceError::ValidationError(errors) => ApiError::validation(errors),
            RecipeServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<RelationServiceError> for ApiError {
    fn from(err: RelationServiceError) -> Self {
        match err {
            RelationServiceError::NotFound(msg) => ApiError::not_found(msg),
            RelationServiceError::Conflict(msg) => ApiError::conflict(msg),
            RelationServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<SubscriptionServiceError> for ApiError {
    fn from(err: SubscriptionServiceError) -> Self {
        match err {
            SubscriptionServiceError::NotFound(msg) => ApiError::not_found(msg),
            SubscriptionServiceError::SelfReferenceRejected => ApiError::validation(
                ValidationErrors::single("author", "You cannot subscribe to yourself."),
            ),
            SubscriptionServiceError::Conflict(msg) => ApiError::conflict(msg),
            SubscriptionServiceError::ValidationError(errors) => ApiError::validation(errors),
            SubscriptionServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

impl From<ShoppingListServiceError> for ApiError {
    fn from(err: ShoppingListServiceError) -> Self {
        match err {
            ShoppingListServiceError::InternalError(e) => ApiError::internal_error(e),
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Read the user id forwarded by the identity provider
fn extract_user_id(headers: &HeaderMap, header: &HeaderName) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(header) else {
        return Ok(None);
    };

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(Some)
        .ok_or_else(|| ApiError::unauthorized("Malformed user id header"))
}

/// Identity middleware
///
/// Requests without the header continue anonymously. A header naming an
/// unknown or malformed user id is rejected with 401.
pub async fn resolve_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(user_id) = extract_user_id(request.headers(), &state.user_header)? {
        let user = state
            .user_service
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Rejected request for unknown user {}", user_id);
                ApiError::unauthorized("Unknown user")
            })?;

        request.extensions_mut().insert(AuthenticatedUser(user));
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalUser(
            parts
                .extensions
                .get::<AuthenticatedUser>()
                .map(|user| user.0.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn header() -> HeaderName {
        HeaderName::from_static("x-user-id")
    }

    #[test]
    fn test_extract_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(header(), HeaderValue::from_static(" 42 "));
        assert_eq!(extract_user_id(&headers, &header()).unwrap(), Some(42));
    }

    #[test]
    fn test_extract_user_id_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_user_id(&headers, &header()).unwrap(), None);
    }

    #[test]
    fn test_extract_user_id_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(header(), HeaderValue::from_static("abc"));
        let err = extract_user_id(&headers, &header()).unwrap_err();
        assert_eq!(err.error.code, "UNAUTHORIZED");
    }

    #[test]
    fn test_validation_error_carries_fields() {
        let error = ApiError::validation(ValidationErrors::single("tags", "Tags must not repeat."));
        assert_eq!(error.error.code, "VALIDATION_ERROR");
        assert_eq!(
            error.error.details,
            Some(serde_json::json!({"tags": ["Tags must not repeat."]}))
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::forbidden("x"), StatusCode::FORBIDDEN),
            (ApiError::not_found("x"), StatusCode::NOT_FOUND),
            (ApiError::conflict("x"), StatusCode::CONFLICT),
            (ApiError::validation(ValidationErrors::new()), StatusCode::BAD_REQUEST),
            (
                ApiError::internal_error(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_self_subscription_is_bad_request() {
        let error = ApiError::from(SubscriptionServiceError::SelfReferenceRejected);
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
