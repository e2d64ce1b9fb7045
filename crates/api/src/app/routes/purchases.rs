use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use invenhub_auth::Permission;
use invenhub_infra::projections::PurchaseOrderReadModel;
use invenhub_purchasing::{PurchaseOrderId, PurchaseOrderStatus};

use super::parse_id;
use crate::app::dto::{self, Body, Items, Params};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_purchase_order).get(list_purchase_orders))
        .route("/:id", get(get_purchase_order).delete(delete_purchase_order))
        .route("/:id/order", post(mark_ordered))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<dto::CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    let order = services.create_purchase_order(body)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_purchase_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Params(query): Params<dto::StatusQuery>,
) -> Result<Json<Items<PurchaseOrderReadModel>>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_READ)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PurchaseOrderStatus>)
        .transpose()?;
    Ok(Json(services.purchase_orders(status).into()))
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrderReadModel>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_READ)?;
    let order_id: PurchaseOrderId = parse_id(&id)?;
    Ok(Json(services.purchase_order(&order_id)?))
}

pub async fn mark_ordered(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrderReadModel>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    let order_id: PurchaseOrderId = parse_id(&id)?;
    Ok(Json(services.mark_ordered(order_id)?))
}

pub async fn receive_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseOrderReadModel>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    let order_id: PurchaseOrderId = parse_id(&id)?;
    Ok(Json(services.receive_purchase_order(order_id)?))
}

/// The body (`{ "reason": ... }`) is optional.
pub async fn cancel_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Option<Body<dto::CancelPurchaseOrderRequest>>,
) -> Result<Json<PurchaseOrderReadModel>, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    let order_id: PurchaseOrderId = parse_id(&id)?;
    let body = body.map(|Body(b)| b).unwrap_or_default();
    Ok(Json(services.cancel_purchase_order(order_id, body)?))
}

pub async fn delete_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authz::require(&principal, &Permission::PURCHASES_WRITE)?;
    let order_id: PurchaseOrderId = parse_id(&id)?;
    services.delete_purchase_order(order_id)?;
    Ok(StatusCode::NO_CONTENT)
}
