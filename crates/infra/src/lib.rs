//! Infrastructure layer: event stores, command dispatch, read models and
//! background jobs.

pub mod alerts;
pub mod analytics;
pub mod command_dispatcher;
pub mod event_store;
pub mod projections;
pub mod read_model;
pub mod reorder;
pub mod saga;
pub mod streams;

mod integration_tests;

#[cfg(test)]
mod test_support;
