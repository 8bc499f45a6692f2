//! Document state and the append-only transition trail.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{AuditTrail, DocumentStore};
