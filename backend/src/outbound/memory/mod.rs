//! In-process adapters used when no database or cache is configured, and
//! as fast stand-ins in tests.

mod key_value_store;
mod repository;

pub use key_value_store::InMemoryKeyValueStore;
pub use repository::{InMemoryRepository, MemoryScope};
