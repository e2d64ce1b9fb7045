//! Suppliers domain module (event-sourced).
//!
//! Business rules for the vendors the shop buys stock from, implemented as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod supplier;

pub use supplier::{
    ContactInfo, DeactivateSupplier, ReactivateSupplier, RegisterSupplier, RemoveSupplier,
    Supplier, SupplierCommand, SupplierEvent, SupplierId, SupplierRegistered, SupplierStatus,
    SupplierStatusChanged,
    SupplierUpdated, UpdateSupplier,
};
