//! # Import Job Launcher
//!
//! Runs one CSV import as a tracked background job.
//!
//! ## Workflow:
//!
//! 1.  **Registration**: a fresh `job_id` is registered as `Pending` in the
//!     shared `JobsState`.
//!
//! 2.  **Blocking execution**: the pipeline reads the CSV and talks to the
//!     store synchronously, so it runs inside `tokio::task::spawn_blocking`
//!     and never stalls the async runtime.
//!
//! 3.  **Progress reporting**: after every intermediate batch the worker sends
//!     `JobStatus::InProgress(committed)` through the job controller channel
//!     with `blocking_send`.
//!
//! 4.  **Completion**: the outcome of the blocking task (summary, fatal error or
//!     join error) is published as `Completed` or `Failed` and handed back to
//!     the caller together with the store.

use super::pipeline::import_csv;
use crate::config::ImportConfig;
use crate::errors::ImportError;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::store::SightingStore;
use common::jobs::JobStatus;
use common::model::summary::RunSummary;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Runs the import described by `config` against `store` and waits for it.
///
/// On success the store is handed back so the caller can inspect the
/// collection afterwards.
pub async fn run_import_job<S>(
    state: &JobsState,
    config: ImportConfig,
    store: S,
) -> Result<(RunSummary, S), ImportError>
where
    S: SightingStore + Send + 'static,
{
    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let job_id_for_blocking = job_id.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let mut store = store;
        import_blocking(tx, &job_id_for_blocking, &config, &mut store).map(|summary| (summary, store))
    });

    let result = match handle.await {
        Ok(result) => result,
        Err(join_err) => Err(ImportError::Join(join_err.to_string())),
    };

    let status = match &result {
        Ok((summary, _)) => JobStatus::Completed(summary.clone()),
        Err(e) => JobStatus::Failed(e.to_string()),
    };
    let _ = state.tx.send(JobUpdate { job_id, status }).await;

    result
}

/// The synchronous import, designed to be run via `spawn_blocking`.
fn import_blocking<S: SightingStore>(
    tx: mpsc::Sender<JobUpdate>,
    job_id: &str,
    config: &ImportConfig,
    store: &mut S,
) -> Result<RunSummary, ImportError> {
    let _ = tx.blocking_send(JobUpdate {
        job_id: job_id.to_string(),
        status: JobStatus::InProgress(0),
    });

    let mut committed = 0u64;
    import_csv(config, store, |report| {
        committed += report.committed as u64;
        if !report.is_final {
            let _ = tx.blocking_send(JobUpdate {
                job_id: job_id.to_string(),
                status: JobStatus::InProgress(committed),
            });
        }
    })
}
