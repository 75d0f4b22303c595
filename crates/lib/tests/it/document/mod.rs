//! Document integration tests
//!
//! This module tests attribute access on documents: plain attributes,
//! embedded maps, lists of embedded documents and default values, including
//! round trips through a collection.

mod attributes;
mod defaults;
mod lists;
