//! Inventory domain module (event-sourced).
//!
//! One stock ledger per product, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod item;

pub use item::{
    AdjustStock, OpenStock, ReceiveStock, RestoreStock, SellStock, StockAdjusted, StockCommand,
    StockEvent, StockItem, StockOpened, StockReceived, StockRestored, StockSold,
};
