use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::types::{ImportFile, ImportJobId, ImportProgress, ImportStatus, JobError};

/// The read/create surface pollers and the API use.
pub trait ImportJobTracker: Send + Sync {
    fn create_job(&self, file: &ImportFile) -> Result<ImportJobId, JobError>;

    fn get_status(&self, id: ImportJobId) -> Result<ImportProgress, JobError>;
}

/// In-memory tracker; also the write side used by [`super::ImportRunner`].
#[derive(Debug, Default)]
pub struct InMemoryImportTracker {
    jobs: RwLock<HashMap<ImportJobId, ImportProgress>>,
}

impl InMemoryImportTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, id: ImportJobId, f: F) -> Result<ImportProgress, JobError>
    where
        F: FnOnce(&mut ImportProgress) -> Result<(), JobError>,
    {
        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobError::Storage("lock poisoned".to_string()))?;
        let job = jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        if job.status.is_terminal() {
            return Err(JobError::Terminal {
                id,
                status: job.status,
            });
        }

        let mut next = job.clone();
        f(&mut next)?;
        *job = next;
        Ok(job.clone())
    }

    /// `PENDING → RUNNING`.
    pub fn start(&self, id: ImportJobId) -> Result<ImportProgress, JobError> {
        self.update(id, |job| {
            if job.status != ImportStatus::Pending {
                return Err(JobError::InvalidUpdate(format!(
                    "cannot start a job that is {}",
                    job.status
                )));
            }
            job.status = ImportStatus::Running;
            Ok(())
        })
    }

    /// Report absolute progress. Counts never go backwards and `processed`
    /// never exceeds `total`.
    pub fn report(&self, id: ImportJobId, processed: u64, fail_count: u64) -> Result<ImportProgress, JobError> {
        self.update(id, |job| {
            if job.status != ImportStatus::Running {
                return Err(JobError::InvalidUpdate(format!(
                    "progress reported for a job that is {}",
                    job.status
                )));
            }
            if processed < job.processed || fail_count < job.fail_count {
                return Err(JobError::InvalidUpdate(format!(
                    "progress went backwards ({} -> {processed})",
                    job.processed
                )));
            }
            if processed > job.total || fail_count > processed {
                return Err(JobError::InvalidUpdate(format!(
                    "processed {processed} (failed {fail_count}) out of {}",
                    job.total
                )));
            }
            job.processed = processed;
            job.fail_count = fail_count;
            Ok(())
        })
    }

    /// `RUNNING → COMPLETED`. Requires every row to be processed.
    pub fn complete(&self, id: ImportJobId) -> Result<ImportProgress, JobError> {
        let job = self.update(id, |job| {
            if job.status != ImportStatus::Running || job.processed != job.total {
                return Err(JobError::InvalidUpdate(format!(
                    "cannot complete a {} job at {}/{}",
                    job.status, job.processed, job.total
                )));
            }
            job.status = ImportStatus::Completed;
            job.finished_at = Some(Utc::now());
            Ok(())
        })?;
        info!(job_id = %id, processed = job.processed, failed = job.fail_count, "import completed");
        Ok(job)
    }

    /// Any non-terminal status → `FAILED`.
    pub fn fail(&self, id: ImportJobId, reason: impl Into<String>) -> Result<ImportProgress, JobError> {
        let reason = reason.into();
        let job = self.update(id, |job| {
            job.status = ImportStatus::Failed;
            job.error = Some(reason.clone());
            job.finished_at = Some(Utc::now());
            Ok(())
        })?;
        warn!(job_id = %id, processed = job.processed, error = %reason, "import failed");
        Ok(job)
    }
}

impl ImportJobTracker for InMemoryImportTracker {
    fn create_job(&self, file: &ImportFile) -> Result<ImportJobId, JobError> {
        if file.file_name.trim().is_empty() {
            return Err(JobError::InvalidUpdate("file_name must not be empty".to_string()));
        }

        let id = ImportJobId::new();
        let job = ImportProgress {
            job_id: id,
            module: file.module,
            file_name: file.file_name.clone(),
            processed: 0,
            total: file.rows.len() as u64,
            fail_count: 0,
            status: ImportStatus::Pending,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        };

        let mut jobs = self
            .jobs
            .write()
            .map_err(|_| JobError::Storage("lock poisoned".to_string()))?;
        jobs.insert(id, job);
        info!(job_id = %id, module = %file.module, file_name = %file.file_name, total = file.rows.len(), "import job created");
        Ok(id)
    }

    fn get_status(&self, id: ImportJobId) -> Result<ImportProgress, JobError> {
        let jobs = self
            .jobs
            .read()
            .map_err(|_| JobError::Storage("lock poisoned".to_string()))?;
        jobs.get(&id).cloned().ok_or(JobError::NotFound(id))
    }
}

/// Poll every `interval` until the job is terminal, at most `max_polls` times.
///
/// Returns the first terminal status observed.
pub fn poll_until_terminal<T>(
    tracker: &T,
    id: ImportJobId,
    interval: Duration,
    max_polls: u32,
) -> Result<ImportProgress, JobError>
where
    T: ImportJobTracker + ?Sized,
{
    for poll in 0..max_polls {
        let progress = tracker.get_status(id)?;
        if progress.status.is_terminal() {
            return Ok(progress);
        }
        if poll + 1 < max_polls {
            std::thread::sleep(interval);
        }
    }
    Err(JobError::TimedOut {
        id,
        polls: max_polls,
    })
}
