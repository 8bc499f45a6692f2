//! Per-principal grant matrices.
//!
//! The store knows nothing about dependency rules. `set_many` is its only
//! mutation of grants and is all-or-nothing under a version compare-and-set.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryGrantStore;
pub use r#trait::GrantStore;
