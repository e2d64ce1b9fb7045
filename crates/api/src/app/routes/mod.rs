use core::str::FromStr;

use axum::Router;
use axum::routing::{get, post};

use invenhub_core::DomainError;

use crate::app::errors::ApiError;

pub mod analytics;
pub mod auth;
pub mod notifications;
pub mod products;
pub mod purchases;
pub mod reorder;
pub mod sales;
pub mod suppliers;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints (mounted under `/api`).
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", post(auth::change_password))
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/suppliers", suppliers::router())
        .nest("/sales", sales::router())
        .nest("/purchase-orders", purchases::router())
        .nest("/analytics", analytics::router())
        .nest("/notifications", notifications::router())
        .nest("/reorder", reorder::router())
}

/// Parse a path id (`ProductId`, `SaleId`, ...).
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(ApiError::from)
}
