//! `invenhub-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::AggregateId;

/// Multiply a quantity by a unit amount (minor currency units), saturating.
///
/// Negative quantities count as zero; callers validate quantities before they
/// reach arithmetic.
pub fn line_amount(quantity: i64, unit_amount: u64) -> u64 {
    u64::try_from(quantity).unwrap_or(0).saturating_mul(unit_amount)
}
