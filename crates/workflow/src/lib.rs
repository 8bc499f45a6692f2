//! Document workflow domain (sales and purchase orders).
//!
//! Deterministic state machine only: no IO, no clock, no authorization. The
//! infra layer loads a [`Document`], asks it to `handle` a command, checks the
//! capability the command needs, and commits the resulting events together
//! with their [`TransitionRecord`].

pub mod audit;
pub mod document;
pub mod error;
pub mod kind;

pub use audit::TransitionRecord;
pub use document::{
    ApplyTransition, CreateDocument, Document, DocumentCommand, DocumentCreated, DocumentEvent,
    DocumentStatus, DocumentTransitioned, PaymentStatus, PaymentStatusUpdated, Stamp, Transition,
    UpdatePaymentStatus,
};
pub use error::WorkflowError;
pub use kind::DocumentKind;
