use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use invenhub_auth::Permission;
use invenhub_products::ProductId;

use super::parse_id;
use crate::app::dto::{self, Body, Items, Params};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route("/:id", get(get_product).put(update_product).delete(archive_product))
        .route("/:id/reorder-policy", put(set_reorder_policy))
        .route("/:id/stock", post(adjust_stock))
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Body(body): Body<dto::CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_WRITE)?;
    let product = services.create_product(body)?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Params(query): Params<dto::ProductQuery>,
) -> Result<Json<Items<dto::ProductView>>, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_READ)?;
    Ok(Json(services.products(&query).into()))
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<dto::ProductView>, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_READ)?;
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(services.product(&product_id)?))
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::UpdateProductRequest>,
) -> Result<Json<dto::ProductView>, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_WRITE)?;
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(services.update_product(product_id, body)?))
}

pub async fn set_reorder_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::ReorderPolicyRequest>,
) -> Result<Json<dto::ProductView>, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_WRITE)?;
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(services.set_reorder_policy(product_id, body)?))
}

/// `DELETE` archives: the product leaves default listings but keeps its history.
pub async fn archive_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Json<dto::ProductView>, ApiError> {
    authz::require(&principal, &Permission::PRODUCTS_WRITE)?;
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(services.archive_product(product_id)?))
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Body(body): Body<dto::StockAdjustmentRequest>,
) -> Result<Json<dto::ProductView>, ApiError> {
    authz::require(&principal, &Permission::INVENTORY_ADJUST)?;
    let product_id: ProductId = parse_id(&id)?;
    Ok(Json(services.adjust_stock(product_id, body)?))
}
