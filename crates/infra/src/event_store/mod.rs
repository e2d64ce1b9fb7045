//! Append-only event store boundary.
//!
//! Streams are keyed by aggregate type and id. Two backends share the same append
//! rules: an in-memory store and a JSON-lines file log.

pub mod in_memory;
pub mod json_file;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use json_file::JsonFileEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, StreamKey, UncommittedEvent};
