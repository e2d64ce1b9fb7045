//! Multi-aggregate workflows with compensation.
//!
//! Each step is a single-stream command through the dispatcher. When a later
//! step fails, the steps already committed are undone with compensating
//! commands before the error is returned.

pub mod checkout;
pub mod receiving;

pub use checkout::{record_sale, void_sale};
pub use receiving::receive_purchase_order;
