use thiserror::Error;

use grantflow_auth::Capability;
use grantflow_core::{DocumentId, DomainError, ErrorKind, PrincipalId};

use crate::document::DocumentStatus;

/// Errors of the document workflow.
///
/// `InvalidTransition`, `Forbidden` and the conflicts are terminal: the request
/// changed nothing and is not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("'{transition}' is not allowed while the document is {status}")]
    InvalidTransition {
        transition: String,
        status: DocumentStatus,
    },

    #[error("missing required capability '{capability}'")]
    Forbidden { capability: Capability },

    #[error("unknown actor {0}")]
    UnknownActor(PrincipalId),

    #[error("document {document_id} is {actual}, expected {expected}")]
    StatusConflict {
        document_id: DocumentId,
        expected: DocumentStatus,
        actual: DocumentStatus,
    },

    #[error("document {document_id} changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict {
        document_id: DocumentId,
        expected: u64,
        actual: u64,
    },

    #[error("document {0} already exists")]
    AlreadyExists(DocumentId),

    #[error("document {0} not found")]
    NotFound(DocumentId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            WorkflowError::Forbidden { .. } | WorkflowError::UnknownActor(_) => ErrorKind::Forbidden,
            WorkflowError::StatusConflict { .. }
            | WorkflowError::VersionConflict { .. }
            | WorkflowError::AlreadyExists(_) => ErrorKind::Conflict,
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => WorkflowError::Validation(msg),
            other => WorkflowError::Validation(other.to_string()),
        }
    }
}
