use std::sync::Arc;

use axum::{Extension, Json, Router, routing::post};

use invenhub_auth::Permission;
use invenhub_infra::reorder::ReorderOutcome;

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/run", post(run_reorder))
}

/// Run an auto-reorder pass immediately instead of waiting for the runner.
pub async fn run_reorder(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<ReorderOutcome>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    Ok(Json(services.run_reorder()?))
}
