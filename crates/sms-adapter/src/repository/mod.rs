//! Persistence Adapters - Session implementations and concrete DAOs

pub mod in_memory;
pub mod vertical;

pub use in_memory::{InMemorySession, InMemoryStore};
pub use vertical::{VerticalDao, VerticalRecord};
