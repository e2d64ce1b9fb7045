//! Read model storage abstractions (disposable, rebuilt from the event log).

pub mod store;

pub use store::{InMemoryReadStore, ReadStore};
