use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    routing::{get, post},
};
use uuid::Uuid;

use invenhub_auth::Permission;
use invenhub_infra::alerts::StockAlert;

use crate::app::dto::{self, Params};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Params(query): Params<dto::NotificationsQuery>,
) -> Result<Json<dto::NotificationsResponse>, ApiError> {
    authz::require(&principal, &Permission::NOTIFICATIONS_READ)?;
    Ok(Json(services.notifications(query.include_resolved)))
}

pub async fn mark_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<StockAlert>, ApiError> {
    authz::require(&principal, &Permission::NOTIFICATIONS_READ)?;
    let alert_id: Uuid = id
        .parse()
        .map_err(|e| ApiError::InvalidId(format!("notification id: {e}")))?;
    Ok(Json(services.mark_notification_read(alert_id)?))
}

pub async fn mark_all_read(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authz::require(&principal, &Permission::NOTIFICATIONS_READ)?;
    let marked = services.mark_all_notifications_read();
    Ok(Json(serde_json::json!({ "marked": marked })))
}
