//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: dispatcher, read models and reorder job behind one facade
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request/response DTOs and JSON extractors
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get, routing::post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::{self, AuthState};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = AuthState {
        services: services.clone(),
    };

    let protected = routes::router().route_layer(axum::middleware::from_fn_with_state(
        auth_state.clone(),
        middleware::auth_middleware,
    ));

    let register = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::optional_auth_middleware,
        ));

    let api = Router::new()
        .route("/auth/login", post(routes::auth::login))
        .merge(register)
        .merge(protected);

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api", api)
        .layer(Extension(services))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)),
        )
}
