use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use grantflow_auth::{Capability, Module};
use grantflow_core::{ErrorKind, PrincipalId};

pub use grantflow_core::ImportJobId;

/// An uploaded file, already split into rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFile {
    /// Module the rows belong to, e.g. `customer`.
    pub module: Module,
    pub file_name: String,
    pub rows: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "PENDING",
            ImportStatus::Running => "RUNNING",
            ImportStatus::Completed => "COMPLETED",
            ImportStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a poller sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub job_id: ImportJobId,
    pub module: Module,
    pub file_name: String,
    pub processed: u64,
    pub total: u64,
    pub fail_count: u64,
    pub status: ImportStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("import job not found: {0}")]
    NotFound(ImportJobId),

    #[error("missing required capability '{capability}'")]
    Forbidden { capability: Capability },

    #[error("unknown actor {0}")]
    UnknownActor(PrincipalId),

    #[error("import job {id} is already {status}")]
    Terminal { id: ImportJobId, status: ImportStatus },

    #[error("invalid progress update: {0}")]
    InvalidUpdate(String),

    #[error("import job {id} did not finish after {polls} polls")]
    TimedOut { id: ImportJobId, polls: u32 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::NotFound(_) => ErrorKind::NotFound,
            JobError::Forbidden { .. } | JobError::UnknownActor(_) => ErrorKind::Forbidden,
            JobError::Terminal { .. } => ErrorKind::Conflict,
            JobError::InvalidUpdate(_) => ErrorKind::Validation,
            JobError::TimedOut { .. } | JobError::Storage(_) => ErrorKind::Storage,
        }
    }
}
