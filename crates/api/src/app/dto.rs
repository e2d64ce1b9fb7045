//! Request/response DTOs and JSON extractors.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::{Json, async_trait};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use invenhub_auth::Role;
use invenhub_infra::alerts::StockAlert;
use invenhub_infra::projections::{ProductReadModel, UserReadModel};
use invenhub_products::{Category, ProductId};
use invenhub_sales::PaymentMethod;
use invenhub_suppliers::{ContactInfo, SupplierId};

use super::errors::ApiError;

/// JSON request body; malformed bodies become `400 validation_error`.
#[derive(Debug)]
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::validation(e.body_text()))?;
        Ok(Body(value))
    }
}

/// Query string parameters; malformed values become `400 validation_error`.
#[derive(Debug)]
pub struct Params<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::validation(e.body_text()))?;
        Ok(Params(value))
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

// ── auth & users ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    /// Ignored for the first (bootstrap) user, who is always an admin.
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserReadModel,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

// ── products & stock ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub price: u64,
    #[serde(default)]
    pub cost: u64,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub reorder_quantity: i64,
    #[serde(default)]
    pub initial_stock: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub price: Option<u64>,
    pub cost: Option<u64>,
    /// `null` unlinks the supplier.
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_id: Option<Option<SupplierId>>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPolicyRequest {
    pub reorder_level: i64,
    #[serde(default)]
    pub reorder_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    pub delta: i64,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<Category>,
    /// Case-insensitive match on name or SKU.
    pub q: Option<String>,
    #[serde(default)]
    pub low_stock: bool,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub fn of(on_hand: i64, reorder_level: i64) -> Self {
        if on_hand <= 0 {
            StockStatus::OutOfStock
        } else if on_hand <= reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

/// Catalog entry joined with its stock level.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductReadModel,
    pub on_hand: i64,
    pub stock_status: StockStatus,
    pub margin: u64,
}

impl ProductView {
    pub fn new(product: ProductReadModel, on_hand: i64) -> Self {
        let stock_status = StockStatus::of(on_hand, product.reorder_level);
        let margin = product.price.saturating_sub(product.cost);
        Self {
            product,
            on_hand,
            stock_status,
            margin,
        }
    }
}

// ── suppliers ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SupplierRequest {
    pub name: String,
    #[serde(default)]
    pub contact: ContactInfo,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub lead_time_days: u32,
}

// ── sales ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SaleLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateSaleRequest {
    pub lines: Vec<SaleLineRequest>,
    #[serde(default)]
    pub discount: u64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoidSaleRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ── purchase orders ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PurchaseLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Defaults to the product's current cost.
    #[serde(default)]
    pub unit_cost: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderRequest {
    pub supplier_id: SupplierId,
    pub lines: Vec<PurchaseLineRequest>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelPurchaseOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

// ── notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub unread: usize,
    pub items: Vec<StockAlert>,
}
