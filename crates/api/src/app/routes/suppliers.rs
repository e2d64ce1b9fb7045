use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use invenhub_auth::Permission;
use invenhub_infra::projections::SupplierReadModel;
use invenhub_suppliers::SupplierId;

use super::parse_id;
use crate::app::dto::{self, Body, Items};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_supplier).get(list_suppliers))
        .route("/:id", get(get_supplier).put(update_supplier).delete(remove_supplier))
        .route("/:id/deactivate", post(deactivate_supplier))
        .route("/:id/reactivate", post(reactivate_supplier))
}

pub async fn register_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<dto::SupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier = services.register_supplier(body)?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Json<Items<SupplierReadModel>>, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_READ)?;
    Ok(Json(services.suppliers().into()))
}

pub async fn get_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SupplierReadModel>, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_READ)?;
    let supplier_id: SupplierId = parse_id(&id)?;
    Ok(Json(services.supplier(&supplier_id)?))
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::SupplierRequest>,
) -> Result<Json<SupplierReadModel>, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier_id: SupplierId = parse_id(&id)?;
    Ok(Json(services.update_supplier(supplier_id, body)?))
}

pub async fn deactivate_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SupplierReadModel>, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier_id: SupplierId = parse_id(&id)?;
    Ok(Json(services.deactivate_supplier(supplier_id)?))
}

pub async fn reactivate_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<SupplierReadModel>, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier_id: SupplierId = parse_id(&id)?;
    Ok(Json(services.reactivate_supplier(supplier_id)?))
}

pub async fn remove_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authz::require(&principal, &Permission::SUPPLIERS_WRITE)?;
    let supplier_id: SupplierId = parse_id(&id)?;
    services.remove_supplier(supplier_id)?;
    Ok(StatusCode::NO_CONTENT)
}
