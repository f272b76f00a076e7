//! API layer - HTTP handlers and routing
//!
//! This module contains the HTTP endpoints of the recipe backend:
//! - User and subscription endpoints
//! - Tag and ingredient reference data
//! - Recipe catalogue, favorites, shopping cart and list download
//!
//! Every route lives under `/api`. The caller's identity comes from a
//! trusted header set by the identity provider in front of the service.

pub mod ingredients;
pub mod middleware;
pub mod recipes;
pub mod tags;
pub mod users;

use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser, OptionalUser};

/// Build the API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .nest("/users", users::router())
        .nest("/tags", tags::router())
        .nest("/ingredients", ingredients::router())
        .nest("/recipes", recipes::router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = if cors_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origin = cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
        AllowOrigin::exact(origin)
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, state.user_header.clone()]);

    Ok(Router::new()
        .nest("/api", build_api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    middleware::resolve_identity,
                )),
        )
        .with_state(state))
}
