//! Service wiring: event store, dispatcher, read models and the reorder job.
//!
//! Handlers stay thin: they authorize, parse, and call into [`AppServices`].
//! Every write goes through the [`CommandDispatcher`], whose projection bus
//! updates the read models before the call returns.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use invenhub_auth::user::{ActivateUser, ChangePassword, ChangeRole, DeactivateUser, RegisterUser};
use invenhub_auth::{
    Hs256Jwt, JwtClaims, JwtValidator, Permission, Role, User, UserCommand, UserId, hash_password,
    verify_password,
};
use invenhub_core::{Aggregate, AggregateId, DomainError};
use invenhub_events::Event;
use invenhub_infra::alerts::StockAlert;
use invenhub_infra::analytics::{self, InventorySummary, SalesSummary};
use invenhub_infra::command_dispatcher::{CommandDispatcher, DEFAULT_RETRY_ATTEMPTS, DispatchError};
use invenhub_infra::event_store::{EventStore, InMemoryEventStore, JsonFileEventStore, StoredEvent};
use invenhub_infra::projections::{
    ProjectionBus, ProjectionBusError, PurchaseOrderReadModel, ReadModels, SaleReadModel, SupplierReadModel,
    UserReadModel,
};
use invenhub_infra::reorder::{
    PlannedOrder, ReorderExecutor, ReorderJob, ReorderOutcome, ReorderPlanner, ReorderRunner, ReorderRunnerHandle,
};
use invenhub_infra::saga;
use invenhub_infra::streams;
use invenhub_inventory::{AdjustStock, OpenStock, StockCommand, StockItem};
use invenhub_products::{
    ArchiveProduct, CreateProduct, Product, ProductCommand, ProductId, SetReorderPolicy, UpdateProduct,
    normalize_sku,
};
use invenhub_purchasing::{
    CancelPurchaseOrder, CreatePurchaseOrder, DeletePurchaseOrder, LineItem, MarkOrdered, OrderOrigin,
    PurchaseOrder, PurchaseOrderCommand, PurchaseOrderId, PurchaseOrderStatus, ReceiveGoods,
};
use invenhub_sales::{RecordSale, SaleId, SaleLine, VoidSale};
use invenhub_suppliers::{
    DeactivateSupplier, ReactivateSupplier, RegisterSupplier, RemoveSupplier, Supplier, SupplierCommand,
    SupplierId, UpdateSupplier,
};

use super::dto;
use super::errors::ApiError;
use crate::authz;
use crate::config::AppConfig;
use crate::context::PrincipalContext;

pub type Dispatcher = CommandDispatcher<Arc<dyn EventStore>, Arc<ProjectionBus>>;

/// Application services shared by all handlers.
pub struct AppServices {
    dispatcher: Arc<Dispatcher>,
    read_models: ReadModels,
    jwt: Hs256Jwt,
    token_ttl: chrono::Duration,
    reorder: Arc<ReorderJob<DispatchingReorderExecutor>>,
    runner: Mutex<Option<ReorderRunnerHandle>>,
    /// Serializes check-then-create for unique keys (SKU, email).
    uniqueness: Mutex<()>,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices").finish_non_exhaustive()
    }
}

impl AppServices {
    /// Open the configured event store and rebuild the read models from it.
    pub fn build(config: &AppConfig) -> Result<Self, ProjectionBusError> {
        let store: Arc<dyn EventStore> = match &config.data_dir {
            Some(dir) => {
                let store = JsonFileEventStore::open(dir)?;
                info!(path = %store.path().display(), "using file event store");
                Arc::new(store)
            }
            None => {
                info!("using in-memory event store");
                Arc::new(InMemoryEventStore::new())
            }
        };
        Self::with_store(store, config)
    }

    pub fn with_store(store: Arc<dyn EventStore>, config: &AppConfig) -> Result<Self, ProjectionBusError> {
        let read_models = ReadModels::new();
        let bus = Arc::new(read_models.bus());
        let replayed = bus.rebuild(&store)?;
        info!(events = replayed, "read models rebuilt");

        let dispatcher = Arc::new(CommandDispatcher::new(store, bus));
        let executor = Arc::new(DispatchingReorderExecutor {
            dispatcher: dispatcher.clone(),
        });
        let reorder = Arc::new(ReorderJob::new(
            read_models.clone(),
            ReorderPlanner::new(config.reorder_cooldown),
            executor,
        ));

        Ok(Self {
            dispatcher,
            read_models,
            jwt: Hs256Jwt::new(config.jwt_secret.as_bytes()),
            token_ttl: config.token_ttl,
            reorder,
            runner: Mutex::new(None),
            uniqueness: Mutex::new(()),
        })
    }

    pub fn read_models(&self) -> &ReadModels {
        &self.read_models
    }

    /// Start the background reorder thread.
    pub fn start_reorder_runner(&self, interval: Duration) -> std::io::Result<()> {
        let runner = ReorderRunner {
            interval,
            ..ReorderRunner::default()
        };
        let handle = runner.spawn(self.reorder.clone())?;
        if let Ok(mut slot) = self.runner.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.shutdown();
            }
        }
        Ok(())
    }

    /// Stop the background reorder thread, if running.
    pub fn shutdown(&self) {
        let handle = self.runner.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }

    fn trigger_reorder(&self) {
        if let Ok(slot) = self.runner.lock() {
            if let Some(handle) = slot.as_ref() {
                handle.trigger();
            }
        }
    }

    fn unique_section(&self) -> Result<std::sync::MutexGuard<'_, ()>, ApiError> {
        self.uniqueness
            .lock()
            .map_err(|_| ApiError::Internal("uniqueness lock poisoned".to_string()))
    }

    fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl Fn(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, ApiError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + serde::Serialize + serde::de::DeserializeOwned,
    {
        Ok(self
            .dispatcher
            .dispatch_with_retry(DEFAULT_RETRY_ATTEMPTS, aggregate_id, aggregate_type, command, make_aggregate)?)
    }

    // ── auth & users ────────────────────────────────────────────────────────

    /// Resolve a bearer token to the caller. The role comes from the user
    /// directory, so role changes and deactivation apply immediately.
    pub fn authenticate(&self, token: &str) -> Result<PrincipalContext, ApiError> {
        let claims = self.jwt.validate(token)?;
        let user = self
            .read_models
            .users
            .get(&claims.sub)
            .filter(UserReadModel::is_active)
            .ok_or_else(|| ApiError::unauthenticated("unknown or deactivated user"))?;
        Ok(PrincipalContext::new(user.user_id, user.email, user.role))
    }

    /// Register a user. The first user bootstraps the shop as admin without
    /// authentication; afterwards `users.manage` is required.
    pub fn register_user(
        &self,
        actor: Option<&PrincipalContext>,
        req: dto::RegisterRequest,
    ) -> Result<UserReadModel, ApiError> {
        let _guard = self.unique_section()?;

        let role = if self.read_models.users.is_empty() {
            Role::Admin
        } else {
            let actor = actor.ok_or_else(|| ApiError::unauthenticated("authentication required"))?;
            authz::require(actor, &Permission::USERS_MANAGE)?;
            req.role.unwrap_or(Role::Cashier)
        };

        if self.read_models.users.find_by_email(&req.email).is_some() {
            return Err(ApiError::conflict("email already registered"));
        }

        let user_id = UserId::generate();
        let cmd = UserCommand::Register(RegisterUser {
            user_id,
            email: req.email,
            name: req.name,
            role,
            password_hash: hash_password(&req.password)?,
            occurred_at: Utc::now(),
        });
        self.dispatch(user_id.0, streams::USER, &cmd, user_aggregate)?;
        info!(%user_id, %role, "user registered");
        self.user(&user_id)
    }

    pub fn login(&self, req: dto::LoginRequest) -> Result<dto::LoginResponse, ApiError> {
        let user = self
            .read_models
            .users
            .find_by_email(&req.email)
            .filter(|u| verify_password(&req.password, &u.password_hash))
            .ok_or_else(|| ApiError::unauthenticated("invalid email or password"))?;
        if !user.is_active() {
            return Err(ApiError::unauthenticated("account is deactivated"));
        }

        let now = Utc::now();
        let claims = JwtClaims::new(user.user_id, user.email.clone(), user.role, now, self.token_ttl);
        let token = self.jwt.issue(&claims)?;
        Ok(dto::LoginResponse {
            token,
            expires_at: now + self.token_ttl,
            user,
        })
    }

    pub fn change_password(&self, actor: &PrincipalContext, req: dto::ChangePasswordRequest) -> Result<(), ApiError> {
        let user = self.user(&actor.user_id())?;
        if !verify_password(&req.current_password, &user.password_hash) {
            return Err(ApiError::unauthenticated("current password is incorrect"));
        }
        let cmd = UserCommand::ChangePassword(ChangePassword {
            user_id: user.user_id,
            password_hash: hash_password(&req.new_password)?,
            occurred_at: Utc::now(),
        });
        self.dispatch(user.user_id.0, streams::USER, &cmd, user_aggregate)?;
        Ok(())
    }

    pub fn user(&self, user_id: &UserId) -> Result<UserReadModel, ApiError> {
        self.read_models.users.get(user_id).ok_or_else(|| ApiError::not_found("user"))
    }

    pub fn users(&self) -> Vec<UserReadModel> {
        self.read_models.users.list()
    }

    pub fn change_role(&self, actor: &PrincipalContext, user_id: UserId, role: Role) -> Result<UserReadModel, ApiError> {
        let cmd = UserCommand::ChangeRole(ChangeRole {
            user_id,
            role,
            actor_id: actor.user_id(),
            occurred_at: Utc::now(),
        });
        self.dispatch(user_id.0, streams::USER, &cmd, user_aggregate)?;
        self.user(&user_id)
    }

    pub fn deactivate_user(&self, actor: &PrincipalContext, user_id: UserId) -> Result<UserReadModel, ApiError> {
        let cmd = UserCommand::Deactivate(DeactivateUser {
            user_id,
            actor_id: actor.user_id(),
            occurred_at: Utc::now(),
        });
        self.dispatch(user_id.0, streams::USER, &cmd, user_aggregate)?;
        self.user(&user_id)
    }

    pub fn activate_user(&self, user_id: UserId) -> Result<UserReadModel, ApiError> {
        let cmd = UserCommand::Activate(ActivateUser {
            user_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(user_id.0, streams::USER, &cmd, user_aggregate)?;
        self.user(&user_id)
    }

    // ── products & stock ────────────────────────────────────────────────────

    fn ensure_supplier(&self, supplier_id: Option<SupplierId>) -> Result<(), ApiError> {
        match supplier_id {
            Some(id) if self.read_models.suppliers.get(&id).is_none() => {
                Err(ApiError::validation(format!("unknown supplier {id}")))
            }
            _ => Ok(()),
        }
    }

    /// Create a product and open its stock ledger.
    pub fn create_product(&self, req: dto::CreateProductRequest) -> Result<dto::ProductView, ApiError> {
        if req.initial_stock < 0 {
            return Err(ApiError::validation("initial stock cannot be negative"));
        }
        self.ensure_supplier(req.supplier_id)?;

        let product_id = ProductId::generate();
        let now = Utc::now();
        {
            let _guard = self.unique_section()?;
            let sku = normalize_sku(&req.sku);
            if self.read_models.products.find_active_by_sku(&sku).is_some() {
                return Err(ApiError::conflict(format!("sku {sku} already exists")));
            }
            let cmd = ProductCommand::CreateProduct(CreateProduct {
                product_id,
                sku,
                name: req.name,
                description: req.description,
                category: req.category,
                price: req.price,
                cost: req.cost,
                supplier_id: req.supplier_id,
                reorder_level: req.reorder_level,
                reorder_quantity: req.reorder_quantity,
                occurred_at: now,
            });
            self.dispatch(product_id.0, streams::PRODUCT, &cmd, product)?;
        }

        let open = StockCommand::Open(OpenStock {
            product_id,
            initial: req.initial_stock,
            occurred_at: now,
        });
        if let Err(e) = self.dispatch(product_id.0, streams::STOCK, &open, stock) {
            warn!(%product_id, error = %e, "opening stock failed, archiving product");
            let archive = ProductCommand::ArchiveProduct(ArchiveProduct {
                product_id,
                occurred_at: now,
            });
            if let Err(undo) = self.dispatch(product_id.0, streams::PRODUCT, &archive, product) {
                error!(%product_id, error = %undo, "failed to archive product without stock ledger");
            }
            return Err(e);
        }
        info!(%product_id, initial = req.initial_stock, "product created");

        self.trigger_reorder();
        self.product(&product_id)
    }

    pub fn update_product(&self, product_id: ProductId, req: dto::UpdateProductRequest) -> Result<dto::ProductView, ApiError> {
        if let Some(supplier_id) = req.supplier_id {
            self.ensure_supplier(supplier_id)?;
        }
        let cmd = ProductCommand::UpdateProduct(UpdateProduct {
            name: req.name,
            description: req.description,
            category: req.category,
            price: req.price,
            cost: req.cost,
            supplier_id: req.supplier_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(product_id.0, streams::PRODUCT, &cmd, product)?;
        self.trigger_reorder();
        self.product(&product_id)
    }

    pub fn set_reorder_policy(
        &self,
        product_id: ProductId,
        req: dto::ReorderPolicyRequest,
    ) -> Result<dto::ProductView, ApiError> {
        let cmd = ProductCommand::SetReorderPolicy(SetReorderPolicy {
            product_id,
            reorder_level: req.reorder_level,
            reorder_quantity: req.reorder_quantity,
            occurred_at: Utc::now(),
        });
        self.dispatch(product_id.0, streams::PRODUCT, &cmd, product)?;
        self.trigger_reorder();
        self.product(&product_id)
    }

    pub fn archive_product(&self, product_id: ProductId) -> Result<dto::ProductView, ApiError> {
        let cmd = ProductCommand::ArchiveProduct(ArchiveProduct {
            product_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(product_id.0, streams::PRODUCT, &cmd, product)?;
        self.product(&product_id)
    }

    /// Manual stock count correction.
    pub fn adjust_stock(&self, product_id: ProductId, req: dto::StockAdjustmentRequest) -> Result<dto::ProductView, ApiError> {
        self.product(&product_id)?;
        let cmd = StockCommand::Adjust(AdjustStock {
            product_id,
            delta: req.delta,
            reason: req.reason,
            occurred_at: Utc::now(),
        });
        self.dispatch(product_id.0, streams::STOCK, &cmd, stock)?;
        if req.delta < 0 {
            self.trigger_reorder();
        }
        self.product(&product_id)
    }

    pub fn product(&self, product_id: &ProductId) -> Result<dto::ProductView, ApiError> {
        let product = self
            .read_models
            .products
            .get(product_id)
            .ok_or_else(|| ApiError::not_found("product"))?;
        Ok(dto::ProductView::new(product, self.read_models.stock.on_hand(product_id)))
    }

    pub fn products(&self, query: &dto::ProductQuery) -> Vec<dto::ProductView> {
        let needle = query.q.as_deref().map(str::trim).map(str::to_lowercase);
        self.read_models
            .products
            .list()
            .into_iter()
            .filter(|p| query.include_archived || p.is_active())
            .filter(|p| query.category.is_none_or(|c| p.category == c))
            .filter(|p| {
                needle.as_deref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n) || p.sku.to_lowercase().contains(n)
                })
            })
            .map(|p| {
                let on_hand = self.read_models.stock.on_hand(&p.product_id);
                dto::ProductView::new(p, on_hand)
            })
            .filter(|v| !query.low_stock || v.stock_status != dto::StockStatus::InStock)
            .collect()
    }

    // ── suppliers ───────────────────────────────────────────────────────────

    pub fn register_supplier(&self, req: dto::SupplierRequest) -> Result<SupplierReadModel, ApiError> {
        let supplier_id = SupplierId::generate();
        let cmd = SupplierCommand::Register(RegisterSupplier {
            supplier_id,
            name: req.name,
            contact: req.contact,
            contact_person: req.contact_person,
            lead_time_days: req.lead_time_days,
            occurred_at: Utc::now(),
        });
        self.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, supplier)?;
        self.supplier(&supplier_id)
    }

    pub fn update_supplier(&self, supplier_id: SupplierId, req: dto::SupplierRequest) -> Result<SupplierReadModel, ApiError> {
        let cmd = SupplierCommand::Update(UpdateSupplier {
            supplier_id,
            name: req.name,
            contact: req.contact,
            contact_person: req.contact_person,
            lead_time_days: req.lead_time_days,
            occurred_at: Utc::now(),
        });
        self.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, supplier)?;
        self.supplier(&supplier_id)
    }

    pub fn deactivate_supplier(&self, supplier_id: SupplierId) -> Result<SupplierReadModel, ApiError> {
        let cmd = SupplierCommand::Deactivate(DeactivateSupplier {
            supplier_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, supplier)?;
        self.supplier(&supplier_id)
    }

    pub fn reactivate_supplier(&self, supplier_id: SupplierId) -> Result<SupplierReadModel, ApiError> {
        let cmd = SupplierCommand::Reactivate(ReactivateSupplier {
            supplier_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, supplier)?;
        self.trigger_reorder();
        self.supplier(&supplier_id)
    }

    pub fn remove_supplier(&self, supplier_id: SupplierId) -> Result<(), ApiError> {
        let cmd = SupplierCommand::Remove(RemoveSupplier {
            supplier_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(supplier_id.0, streams::SUPPLIER, &cmd, supplier)?;
        Ok(())
    }

    pub fn supplier(&self, supplier_id: &SupplierId) -> Result<SupplierReadModel, ApiError> {
        self.read_models
            .suppliers
            .get(supplier_id)
            .ok_or_else(|| ApiError::not_found("supplier"))
    }

    pub fn suppliers(&self) -> Vec<SupplierReadModel> {
        self.read_models.suppliers.list()
    }

    // ── sales ───────────────────────────────────────────────────────────────

    /// Record a sale at current catalog prices, taking stock for every line.
    pub fn create_sale(&self, cashier: &PrincipalContext, req: dto::CreateSaleRequest) -> Result<SaleReadModel, ApiError> {
        let lines = req
            .lines
            .iter()
            .map(|line| {
                let product = self
                    .read_models
                    .products
                    .get(&line.product_id)
                    .ok_or_else(|| ApiError::not_found("product"))?;
                if !product.is_active() {
                    return Err(ApiError::Invariant(format!("product {} is archived", product.sku)));
                }
                Ok(SaleLine {
                    product_id: product.product_id,
                    sku: product.sku,
                    name: product.name,
                    quantity: line.quantity,
                    unit_price: product.price,
                    unit_cost: product.cost,
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        let sale_id = SaleId::generate();
        saga::record_sale(
            &*self.dispatcher,
            RecordSale {
                sale_id,
                lines,
                discount: req.discount,
                payment_method: req.payment_method,
                cashier_id: cashier.user_id(),
                customer_name: req.customer_name,
                occurred_at: Utc::now(),
            },
        )?;
        info!(%sale_id, cashier = %cashier.user_id(), "sale recorded");

        self.trigger_reorder();
        self.sale(&sale_id)
    }

    pub fn void_sale(&self, actor: &PrincipalContext, sale_id: SaleId, req: dto::VoidSaleRequest) -> Result<SaleReadModel, ApiError> {
        saga::void_sale(
            &*self.dispatcher,
            VoidSale {
                sale_id,
                reason: req.reason,
                voided_by: actor.user_id(),
                occurred_at: Utc::now(),
            },
        )?;
        info!(%sale_id, voided_by = %actor.user_id(), "sale voided");
        self.sale(&sale_id)
    }

    pub fn sale(&self, sale_id: &SaleId) -> Result<SaleReadModel, ApiError> {
        self.read_models.sales.get(sale_id).ok_or_else(|| ApiError::not_found("sale"))
    }

    pub fn sales(&self, range: &dto::RangeQuery) -> Vec<SaleReadModel> {
        self.read_models.sales.list_between(range.from, range.to)
    }

    // ── purchase orders ─────────────────────────────────────────────────────

    pub fn create_purchase_order(&self, req: dto::CreatePurchaseOrderRequest) -> Result<PurchaseOrderReadModel, ApiError> {
        let supplier = self.supplier(&req.supplier_id)?;
        if !supplier.is_active() {
            return Err(ApiError::Invariant(format!("supplier {} is inactive", supplier.name)));
        }

        let lines = req
            .lines
            .iter()
            .map(|line| {
                let product = self
                    .read_models
                    .products
                    .get(&line.product_id)
                    .ok_or_else(|| ApiError::not_found("product"))?;
                Ok(LineItem {
                    product_id: product.product_id,
                    sku: product.sku,
                    name: product.name,
                    quantity: line.quantity,
                    unit_cost: line.unit_cost.unwrap_or(product.cost),
                })
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        let order_id = PurchaseOrderId::generate();
        let cmd = PurchaseOrderCommand::Create(CreatePurchaseOrder {
            order_id,
            supplier_id: supplier.supplier_id,
            lines,
            origin: OrderOrigin::Manual,
            notes: req.notes,
            expected_at: req.expected_at,
            occurred_at: Utc::now(),
        });
        self.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, purchase_order)?;
        self.purchase_order(&order_id)
    }

    pub fn mark_ordered(&self, order_id: PurchaseOrderId) -> Result<PurchaseOrderReadModel, ApiError> {
        let cmd = PurchaseOrderCommand::MarkOrdered(MarkOrdered {
            order_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, purchase_order)?;
        self.purchase_order(&order_id)
    }

    /// Receive all goods on the order and add them to stock.
    pub fn receive_purchase_order(&self, order_id: PurchaseOrderId) -> Result<PurchaseOrderReadModel, ApiError> {
        saga::receive_purchase_order(
            &*self.dispatcher,
            ReceiveGoods {
                order_id,
                occurred_at: Utc::now(),
            },
        )?;
        info!(%order_id, "purchase order received");
        self.purchase_order(&order_id)
    }

    pub fn cancel_purchase_order(
        &self,
        order_id: PurchaseOrderId,
        req: dto::CancelPurchaseOrderRequest,
    ) -> Result<PurchaseOrderReadModel, ApiError> {
        let cmd = PurchaseOrderCommand::Cancel(CancelPurchaseOrder {
            order_id,
            reason: req.reason,
            occurred_at: Utc::now(),
        });
        self.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, purchase_order)?;
        self.trigger_reorder();
        self.purchase_order(&order_id)
    }

    pub fn delete_purchase_order(&self, order_id: PurchaseOrderId) -> Result<(), ApiError> {
        let cmd = PurchaseOrderCommand::Delete(DeletePurchaseOrder {
            order_id,
            occurred_at: Utc::now(),
        });
        self.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, purchase_order)?;
        self.trigger_reorder();
        Ok(())
    }

    pub fn purchase_order(&self, order_id: &PurchaseOrderId) -> Result<PurchaseOrderReadModel, ApiError> {
        self.read_models
            .purchase_orders
            .get(order_id)
            .ok_or_else(|| ApiError::not_found("purchase order"))
    }

    pub fn purchase_orders(&self, status: Option<PurchaseOrderStatus>) -> Vec<PurchaseOrderReadModel> {
        self.read_models.purchase_orders.list(status)
    }

    // ── analytics, notifications, reorder ───────────────────────────────────

    pub fn sales_summary(&self, range: &dto::RangeQuery) -> SalesSummary {
        let sales = self.read_models.sales.list_between(range.from, range.to);
        analytics::sales_summary(&sales, range.from, range.to)
    }

    pub fn inventory_summary(&self) -> InventorySummary {
        analytics::inventory_summary(&self.read_models.products.list(), &self.read_models.stock.list())
    }

    pub fn notifications(&self, include_resolved: bool) -> dto::NotificationsResponse {
        dto::NotificationsResponse {
            unread: self.read_models.alerts.unread_count(),
            items: self.read_models.alerts.list(include_resolved),
        }
    }

    pub fn mark_notification_read(&self, alert_id: Uuid) -> Result<StockAlert, ApiError> {
        Ok(self.read_models.alerts.mark_read(alert_id)?)
    }

    pub fn mark_all_notifications_read(&self) -> usize {
        self.read_models.alerts.mark_all_read()
    }

    /// Run one reorder pass now.
    pub fn run_reorder(&self) -> Result<ReorderOutcome, ApiError> {
        let outcome = self.reorder.run_once(Utc::now())?;
        info!(orders = outcome.orders.len(), lines = outcome.lines, "manual reorder pass");
        Ok(outcome)
    }
}

impl Drop for AppServices {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Files planned reorders as `auto_reorder` purchase orders.
pub struct DispatchingReorderExecutor {
    dispatcher: Arc<Dispatcher>,
}

impl ReorderExecutor for DispatchingReorderExecutor {
    type Error = DispatchError;

    fn file_order(&self, order: &PlannedOrder) -> Result<PurchaseOrderId, Self::Error> {
        let order_id = PurchaseOrderId::generate();
        let cmd = PurchaseOrderCommand::Create(CreatePurchaseOrder {
            order_id,
            supplier_id: order.supplier_id,
            lines: order.lines.clone(),
            origin: OrderOrigin::AutoReorder,
            notes: Some(format!("Automatic reorder of {} low-stock item(s)", order.lines.len())),
            expected_at: None,
            occurred_at: Utc::now(),
        });
        self.dispatcher.dispatch(order_id.0, streams::PURCHASE_ORDER, &cmd, purchase_order)?;
        Ok(order_id)
    }
}

fn product(id: AggregateId) -> Product {
    Product::empty(ProductId::new(id))
}

fn stock(id: AggregateId) -> StockItem {
    StockItem::empty(ProductId::new(id))
}

fn supplier(id: AggregateId) -> Supplier {
    Supplier::empty(SupplierId::new(id))
}

fn purchase_order(id: AggregateId) -> PurchaseOrder {
    PurchaseOrder::empty(PurchaseOrderId::new(id))
}

fn user_aggregate(id: AggregateId) -> User {
    User::empty(UserId::new(id))
}

#[cfg(test)]
mod tests {
    use invenhub_core::ExpectedVersion;
    use invenhub_infra::event_store::{EventStoreError, UncommittedEvent};

    use super::*;

    fn services() -> AppServices {
        AppServices::build(&AppConfig::default()).unwrap()
    }

    fn admin(services: &AppServices) -> PrincipalContext {
        let user = services
            .register_user(
                None,
                dto::RegisterRequest {
                    email: "Owner@Shop.test".to_string(),
                    name: "Owner".to_string(),
                    password: "correct horse".to_string(),
                    role: Some(Role::Cashier),
                },
            )
            .unwrap();
        PrincipalContext::new(user.user_id, user.email, user.role)
    }

    fn product_request(sku: &str, initial_stock: i64) -> dto::CreateProductRequest {
        dto::CreateProductRequest {
            sku: sku.to_string(),
            name: format!("{sku} item"),
            description: String::new(),
            category: invenhub_products::Category::Beverages,
            price: 250,
            cost: 100,
            supplier_id: None,
            reorder_level: 2,
            reorder_quantity: 0,
            initial_stock,
        }
    }

    #[test]
    fn first_user_is_admin_then_registration_needs_a_manager_of_users() {
        let services = services();
        let owner = admin(&services);
        assert_eq!(owner.role(), Role::Admin);
        assert_eq!(owner.email(), "owner@shop.test");

        let anonymous = dto::RegisterRequest {
            email: "clerk@shop.test".to_string(),
            name: "Clerk".to_string(),
            password: "password123".to_string(),
            role: None,
        };
        assert!(matches!(
            services.register_user(None, anonymous),
            Err(ApiError::Unauthenticated(_))
        ));

        let clerk = services
            .register_user(
                Some(&owner),
                dto::RegisterRequest {
                    email: "clerk@shop.test".to_string(),
                    name: "Clerk".to_string(),
                    password: "password123".to_string(),
                    role: None,
                },
            )
            .unwrap();
        assert_eq!(clerk.role, Role::Cashier);
    }

    #[test]
    fn login_issues_a_token_that_authenticates() {
        let services = services();
        admin(&services);

        let login = services
            .login(dto::LoginRequest {
                email: "owner@shop.test".to_string(),
                password: "correct horse".to_string(),
            })
            .unwrap();
        let principal = services.authenticate(&login.token).unwrap();
        assert_eq!(principal.role(), Role::Admin);

        let wrong = services.login(dto::LoginRequest {
            email: "owner@shop.test".to_string(),
            password: "wrong password".to_string(),
        });
        assert!(matches!(wrong, Err(ApiError::Unauthenticated(_))));
    }

    #[test]
    fn duplicate_active_sku_is_a_conflict() {
        let services = services();
        services.create_product(product_request("COLA-330", 10)).unwrap();
        let err = services.create_product(product_request(" COLA-330 ", 1)).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn sku_uniqueness_ignores_case() {
        let services = services();
        services.create_product(product_request("COLA-330", 10)).unwrap();
        let err = services.create_product(product_request("cola-330", 1)).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let with_sku = services
            .products(&dto::ProductQuery::default())
            .into_iter()
            .filter(|v| v.product.sku == "COLA-330")
            .count();
        assert_eq!(with_sku, 1);
    }

    /// Event store that refuses every stock ledger append.
    struct NoStockLedger(InMemoryEventStore);

    impl EventStore for NoStockLedger {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            if events.iter().any(|e| e.aggregate_type == streams::STOCK) {
                return Err(EventStoreError::InvalidAppend("stock ledger unavailable".to_string()));
            }
            self.0.append(events, expected_version)
        }

        fn load_stream(&self, aggregate_type: &str, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.0.load_stream(aggregate_type, aggregate_id)
        }

        fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.0.load_all()
        }
    }

    #[test]
    fn product_is_archived_when_its_stock_ledger_cannot_open() {
        let store: Arc<dyn EventStore> = Arc::new(NoStockLedger(InMemoryEventStore::new()));
        let services = AppServices::with_store(store, &AppConfig::default()).unwrap();

        let err = services.create_product(product_request("SODA", 3)).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(services.products(&dto::ProductQuery::default()).is_empty());

        let archived = services.products(&dto::ProductQuery {
            include_archived: true,
            ..Default::default()
        });
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].product.status, invenhub_products::ProductStatus::Archived);
    }

    #[test]
    fn negative_initial_stock_is_rejected() {
        let services = services();
        let err = services.create_product(product_request("JUICE", -1)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(services.products(&dto::ProductQuery::default()).is_empty());
    }

    #[test]
    fn sale_takes_stock_and_void_restores_it() {
        let services = services();
        let owner = admin(&services);
        let product = services.create_product(product_request("WATER", 5)).unwrap();
        let product_id = product.product.product_id;

        let sale = services
            .create_sale(
                &owner,
                dto::CreateSaleRequest {
                    lines: vec![dto::SaleLineRequest { product_id, quantity: 4 }],
                    discount: 100,
                    payment_method: invenhub_sales::PaymentMethod::Card,
                    customer_name: None,
                },
            )
            .unwrap();
        assert_eq!(sale.total, 4 * 250 - 100);
        assert_eq!(services.product(&product_id).unwrap().on_hand, 1);

        let low = services.products(&dto::ProductQuery {
            low_stock: true,
            ..Default::default()
        });
        assert_eq!(low.len(), 1);

        services
            .void_sale(&owner, sale.sale_id, dto::VoidSaleRequest { reason: "returned".to_string() })
            .unwrap();
        assert_eq!(services.product(&product_id).unwrap().on_hand, 5);
    }

    #[test]
    fn manual_reorder_pass_files_an_auto_reorder_order() {
        let services = services();
        let supplier = services
            .register_supplier(dto::SupplierRequest {
                name: "Fresh Farms".to_string(),
                contact: Default::default(),
                contact_person: None,
                lead_time_days: 2,
            })
            .unwrap();
        let mut low = product_request("BREAD", 1);
        low.supplier_id = Some(supplier.supplier_id);
        low.reorder_level = 4;
        services.create_product(low).unwrap();

        let outcome = services.run_reorder().unwrap();
        assert_eq!(outcome.orders.len(), 1);
        let order = services.purchase_order(&outcome.orders[0]).unwrap();
        assert_eq!(order.origin, OrderOrigin::AutoReorder);
        assert_eq!(order.lines[0].quantity, 7);

        assert!(services.run_reorder().unwrap().orders.is_empty());
    }

    #[test]
    fn deleting_unknown_purchase_order_is_not_found() {
        let services = services();
        let err = services.delete_purchase_order(PurchaseOrderId::generate()).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
