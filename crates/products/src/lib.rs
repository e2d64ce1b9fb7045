//! Products domain module (event-sourced).
//!
//! This crate contains the business rules for the shop's catalog, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). Stock
//! levels live in `invenhub-inventory`.

pub mod category;
pub mod product;

pub use category::Category;
pub use product::{
    ArchiveProduct, CreateProduct, Product, ProductArchived, ProductCommand, ProductCreated,
    ProductEvent, ProductId, ProductStatus, ProductUpdated, ReorderPolicySet, SetReorderPolicy,
    UpdateProduct, normalize_sku,
};
