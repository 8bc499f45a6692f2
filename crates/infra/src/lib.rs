//! Infrastructure layer: stores, the authorization gate, and the services that
//! compose them (grant editing, workflow execution, import tracking).

pub mod document_store;
pub mod error;
pub mod gate;
pub mod grant_editor;
pub mod grant_store;
pub mod imports;
pub mod pending;
pub mod workflow_engine;


pub use error::StoreError;
