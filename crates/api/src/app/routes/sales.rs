use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use invenhub_auth::Permission;
use invenhub_infra::projections::SaleReadModel;
use invenhub_sales::SaleId;

use super::parse_id;
use crate::app::dto::{self, Body, Items, Params};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_sale).get(list_sales))
        .route("/:id", get(get_sale))
        .route("/:id/void", post(void_sale))
}

pub async fn create_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<dto::CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&principal, &Permission::SALES_CREATE)?;
    let sale = services.create_sale(&principal, body)?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Newest first, optionally bounded by `from`/`to` (RFC 3339).
pub async fn list_sales(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Params(range): Params<dto::RangeQuery>,
) -> Result<Json<Items<SaleReadModel>>, ApiError> {
    authz::require(&principal, &Permission::SALES_READ)?;
    Ok(Json(services.sales(&range).into()))
}

pub async fn get_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SaleReadModel>, ApiError> {
    authz::require(&principal, &Permission::SALES_READ)?;
    let sale_id: SaleId = parse_id(&id)?;
    Ok(Json(services.sale(&sale_id)?))
}

pub async fn void_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::VoidSaleRequest>,
) -> Result<Json<SaleReadModel>, ApiError> {
    authz::require(&principal, &Permission::SALES_VOID)?;
    let sale_id: SaleId = parse_id(&id)?;
    Ok(Json(services.void_sale(&principal, sale_id, body)?))
}
