use std::sync::Arc;

use axum::{Extension, Json, Router, routing::get};

use invenhub_auth::Permission;
use invenhub_infra::analytics::{InventorySummary, SalesSummary};

use crate::app::dto::{self, Params};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/sales", get(sales_summary))
        .route("/inventory", get(inventory_summary))
}

pub async fn sales_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Params(range): Params<dto::RangeQuery>,
) -> Result<Json<SalesSummary>, ApiError> {
    authz::require(&principal, &Permission::ANALYTICS_READ)?;
    Ok(Json(services.sales_summary(&range)))
}

pub async fn inventory_summary(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<InventorySummary>, ApiError> {
    authz::require(&principal, &Permission::ANALYTICS_READ)?;
    Ok(Json(services.inventory_summary()))
}
