use serde::Serialize;
use thiserror::Error;

use grantflow_core::{DomainError, ErrorKind, PendingChangeId, PrincipalId};

use crate::catalog::Capability;

/// A dependency that must be granted before a `create` grant can be enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingDependency {
    pub capability: Capability,
    /// Display label, e.g. `Customers: Read`.
    pub label: String,
}

impl MissingDependency {
    pub fn new(capability: Capability) -> Self {
        Self {
            label: capability.label(),
            capability,
        }
    }
}

/// Errors of the grant write path (editing, confirming, provisioning).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrantError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("confirmation required: missing {}", format_missing(.missing))]
    DependencyRequired {
        pending_change_id: PendingChangeId,
        missing: Vec<MissingDependency>,
    },

    #[error("grant set of principal {principal_id} changed (expected version {expected}, found {actual})")]
    Conflict {
        principal_id: PrincipalId,
        expected: u64,
        actual: u64,
    },

    #[error("principal {0} not found")]
    PrincipalNotFound(PrincipalId),

    #[error("pending change {0} not found or expired")]
    PendingChangeNotFound(PendingChangeId),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("storage error: {0}")]
    Storage(String),
}

fn format_missing(missing: &[MissingDependency]) -> String {
    missing
        .iter()
        .map(|m| m.capability.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl GrantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrantError::Validation(_) => ErrorKind::Validation,
            GrantError::DependencyRequired { .. } => ErrorKind::DependencyRequired,
            GrantError::Conflict { .. } => ErrorKind::Conflict,
            GrantError::PrincipalNotFound(_) | GrantError::PendingChangeNotFound(_) => {
                ErrorKind::NotFound
            }
            GrantError::Forbidden(_) => ErrorKind::Forbidden,
            GrantError::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<DomainError> for GrantError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => GrantError::Validation(msg),
            other => GrantError::Validation(other.to_string()),
        }
    }
}
