use std::sync::Arc;
use std::thread;

use serde_json::Value as JsonValue;
use tracing::{debug, error};

use super::tracker::InMemoryImportTracker;
use super::types::{ImportJobId, ImportProgress, JobError};

/// Processes one row. An `Err` counts the row as failed; the import goes on.
pub trait RowHandler: Send + Sync {
    fn handle(&self, index: u64, row: &JsonValue) -> Result<(), String>;
}

impl<F> RowHandler for F
where
    F: Fn(u64, &JsonValue) -> Result<(), String> + Send + Sync,
{
    fn handle(&self, index: u64, row: &JsonValue) -> Result<(), String> {
        self(index, row)
    }
}

/// Drives an import job through the tracker.
#[derive(Debug, Clone)]
pub struct ImportRunner {
    batch_size: u64,
    max_failures: Option<u64>,
}

impl Default for ImportRunner {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_failures: None,
        }
    }
}

impl ImportRunner {
    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Fail the whole job once more than `max` rows failed.
    pub fn with_max_failures(mut self, max: u64) -> Self {
        self.max_failures = Some(max);
        self
    }

    pub fn run<H>(
        &self,
        tracker: &InMemoryImportTracker,
        id: ImportJobId,
        rows: &[JsonValue],
        handler: &H,
    ) -> Result<ImportProgress, JobError>
    where
        H: RowHandler + ?Sized,
    {
        tracker.start(id)?;

        let mut processed = 0u64;
        let mut failed = 0u64;
        for (index, row) in rows.iter().enumerate() {
            if let Err(reason) = handler.handle(index as u64, row) {
                failed += 1;
                debug!(job_id = %id, row = index, %reason, "import row rejected");
            }
            processed += 1;

            if let Some(max) = self.max_failures {
                if failed > max {
                    tracker.report(id, processed, failed)?;
                    return tracker.fail(id, format!("{failed} rows failed (limit {max})"));
                }
            }
            if processed % self.batch_size == 0 {
                tracker.report(id, processed, failed)?;
            }
        }

        tracker.report(id, processed, failed)?;
        tracker.complete(id)
    }

    /// Run on a background thread. Any tracker error fails the job.
    pub fn spawn(
        self,
        tracker: Arc<InMemoryImportTracker>,
        id: ImportJobId,
        rows: Vec<JsonValue>,
        handler: Arc<dyn RowHandler>,
    ) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            if let Err(err) = self.run(&tracker, id, &rows, handler.as_ref()) {
                error!(job_id = %id, error = %err, "import aborted");
                let _ = tracker.fail(id, err.to_string());
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::{ImportFile, ImportJobTracker, ImportStatus, poll_until_terminal};
    use serde_json::json;
    use std::time::Duration;

    fn only_objects(_: u64, row: &JsonValue) -> Result<(), String> {
        match row {
            JsonValue::Object(map) if !map.is_empty() => Ok(()),
            _ => Err("row must be a non-empty object".to_string()),
        }
    }

    fn setup(rows: Vec<JsonValue>) -> (Arc<InMemoryImportTracker>, ImportJobId, Vec<JsonValue>) {
        let tracker = Arc::new(InMemoryImportTracker::new());
        let file = ImportFile {
            module: grantflow_auth::Module::Stock,
            file_name: "stock.json".to_string(),
            rows,
        };
        let id = tracker.create_job(&file).unwrap();
        (tracker, id, file.rows)
    }

    #[test]
    fn bad_rows_are_counted_not_fatal() {
        let (tracker, id, rows) = setup(vec![json!({"sku": "A"}), json!(42), json!({})]);
        let done = ImportRunner::default()
            .with_batch_size(1)
            .run(&tracker, id, &rows, &only_objects)
            .unwrap();
        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!((done.processed, done.fail_count), (3, 2));
    }

    #[test]
    fn failure_limit_fails_the_job() {
        let (tracker, id, rows) = setup(vec![json!(1), json!(2), json!({"sku": "A"})]);
        let done = ImportRunner::default()
            .with_max_failures(1)
            .run(&tracker, id, &rows, &only_objects)
            .unwrap();
        assert_eq!(done.status, ImportStatus::Failed);
        assert_eq!(done.processed, 2);
    }

    #[test]
    fn empty_file_completes_immediately() {
        let (tracker, id, rows) = setup(vec![]);
        let done = ImportRunner::default()
            .run(&tracker, id, &rows, &only_objects)
            .unwrap();
        assert_eq!(done.status, ImportStatus::Completed);
        assert_eq!(done.total, 0);
    }

    #[test]
    fn spawned_job_is_observed_terminal_by_a_poller() {
        let rows: Vec<JsonValue> = (0..50).map(|i| json!({ "row": i })).collect();
        let (tracker, id, rows) = setup(rows);
        let handle = ImportRunner::default()
            .with_batch_size(7)
            .spawn(tracker.clone(), id, rows, Arc::new(only_objects));

        let progress =
            poll_until_terminal(tracker.as_ref(), id, Duration::from_millis(5), 400).unwrap();
        assert_eq!(progress.status, ImportStatus::Completed);
        assert_eq!(progress.processed, 50);
        handle.join().unwrap();
    }
}
