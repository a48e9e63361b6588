//! HTTP surface of the platform.
//!
//! Every route lives under `/api` and answers with the
//! [`ApiResponse`](response::ApiResponse) envelope. Handlers are thin: they
//! extract the caller and the input, call into [`crate::core`], and let
//! [`Error`](crate::errors::Error) pick the status code.

pub mod extract;
pub mod response;
pub mod routes;

use crate::config::AppConfig;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// Storage handle
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Bundles a connection and configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|_| warn!("Ignoring invalid CORS origin '{}'", origin))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION, ACCEPT])
}

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the complete application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/associations", routes::associations::router())
        .nest("/campaigns", routes::campaigns::router())
        .nest("/documents", routes::documents::router())
        .nest("/donations", routes::donations::router())
        .nest("/users", routes::users::router())
        .nest("/payments", routes::payments::router());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(cors_layer(&state.config.server.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
