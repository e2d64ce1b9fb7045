//! Purchasing domain module (event-sourced).
//!
//! Purchase orders to suppliers, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod order;

pub use order::{
    CancelPurchaseOrder, CreatePurchaseOrder, DeletePurchaseOrder, GoodsReceived, LineItem,
    MarkOrdered, OrderOrigin, PurchaseOrder, PurchaseOrderCancelled, PurchaseOrderCommand,
    PurchaseOrderCreated, PurchaseOrderDeleted, PurchaseOrderEvent, PurchaseOrderId,
    PurchaseOrderPlaced, PurchaseOrderStatus, ReceiveGoods, total_cost,
};
