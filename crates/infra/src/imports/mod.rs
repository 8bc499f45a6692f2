//! Bulk-import job tracking.
//!
//! An import is a tiny state machine `PENDING → RUNNING → {COMPLETED, FAILED}`
//! (or straight `PENDING → FAILED`) with monotonic progress. Callers create a
//! job, hand its rows to an [`ImportRunner`], and poll the tracker until the
//! job reaches a terminal status. Both ends are gated per module through
//! [`authorize_import`].

pub mod access;
pub mod runner;
pub mod tracker;
pub mod types;

pub use access::authorize_import;
pub use runner::{ImportRunner, RowHandler};
pub use tracker::{ImportJobTracker, InMemoryImportTracker, poll_until_terminal};
pub use types::{ImportFile, ImportJobId, ImportProgress, ImportStatus, JobError};
