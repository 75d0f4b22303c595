//! Database-style backend implementations
//!
//! These backends provide queryable document storage.

mod in_memory;

pub use in_memory::InMemory;
