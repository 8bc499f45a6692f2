use thiserror::Error;

use grantflow_auth::GrantError;
use grantflow_core::{ErrorKind, ExpectedVersion};
use grantflow_workflow::WorkflowError;

use crate::imports::JobError;

/// Storage-boundary error shared by the grant and document stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("optimistic concurrency check failed (expected {expected:?}, found {actual})")]
    Concurrency { expected: ExpectedVersion, actual: u64 },

    #[error("invalid write: {0}")]
    Invalid(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::AlreadyExists(_) | StoreError::Concurrency { .. } => ErrorKind::Conflict,
            StoreError::Invalid(_) => ErrorKind::Validation,
            StoreError::Unavailable(_) => ErrorKind::Storage,
        }
    }
}

impl From<StoreError> for GrantError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Invalid(msg) => GrantError::Validation(msg),
            other => GrantError::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Invalid(msg) => WorkflowError::Validation(msg),
            other => WorkflowError::Storage(other.to_string()),
        }
    }
}

impl From<StoreError> for JobError {
    fn from(value: StoreError) -> Self {
        JobError::Storage(value.to_string())
    }
}
