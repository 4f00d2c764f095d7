//! # bookstore-api
//!
//! REST API layer: authentication, branch and staff management, catalog CRUD,
//! summaries and dashboard metrics.

pub mod auth;
pub mod middleware;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use bookstore_common::config::AppConfig;
use bookstore_db::Database;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
    /// Process start, reported by the health endpoint
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db,
            config,
            started_at: Instant::now(),
        }
    }
}

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        .merge(routes::auth::router(state.clone()))
        .merge(routes::branches::router(state.clone()))
        .merge(routes::users::router(state.clone()))
        .merge(routes::catalog::router(state.clone()))
        .merge(routes::summary::router(state.clone()))
        .merge(routes::dashboard::router(state.clone()))
        .merge(routes::health::router());

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .layer(cors_layer(&state.config.server.client_url))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}

/// The session cookie only travels cross-origin with credentials, which rules out `Any`.
fn cors_layer(client_url: &str) -> CorsLayer {
    let origin = match client_url.parse::<HeaderValue>() {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            tracing::warn!(client_url, "Invalid client URL, cross-origin requests disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::PUT,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
