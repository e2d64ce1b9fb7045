//! Sales domain module (event-sourced).
//!
//! Point-of-sale receipts, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage). Stock movements caused by a sale are
//! orchestrated by the application layer.

pub mod sale;

pub use sale::{
    PaymentMethod, RecordSale, Sale, SaleCommand, SaleEvent, SaleId, SaleLine, SaleRecorded,
    SaleStatus, SaleVoided, VoidSale, subtotal, validate_lines,
};
