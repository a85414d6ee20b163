//! Tracks the state of long-running import jobs.
//!
//! The import itself runs on a blocking thread (see
//! `services/import/start.rs`) and must never wait on anything but the store.
//! It reports progress by pushing [`JobUpdate`] messages into an MPSC channel;
//! [`start_job_updater`] drains that channel, records the latest
//! [`JobStatus`] of every job in [`JobsState`] and logs each transition.

use common::jobs::JobStatus;
use log::{error, info};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Capacity of the progress channel. A full channel only delays progress
/// messages, never row processing for longer than one send.
pub const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// A thread-safe, shareable registry of job statuses plus the sender
/// background workers use to report into it.
#[derive(Clone)]
pub struct JobsState {
    /// Latest known status per job id.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    pub tx: mpsc::Sender<JobUpdate>,
}

impl JobsState {
    /// Creates the state and the receiver to hand to [`start_job_updater`].
    pub fn new() -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }
}

/// A status change for one job.
#[derive(Debug)]
pub struct JobUpdate {
    pub job_id: String,
    pub status: JobStatus,
}

/// Applies every [`JobUpdate`] received on `rx` to `jobs` until all senders
/// are gone.
pub async fn start_job_updater(
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    mut rx: mpsc::Receiver<JobUpdate>,
) {
    while let Some(update) = rx.recv().await {
        match &update.status {
            JobStatus::Pending => info!("Job {} pending", update.job_id),
            JobStatus::InProgress(inserted) => {
                info!("Job {}: {} sightings committed", update.job_id, inserted)
            }
            JobStatus::Completed(summary) => info!(
                "Job {} completed: {} of {} rows inserted",
                update.job_id, summary.inserted, summary.total_rows
            ),
            JobStatus::Failed(reason) => error!("Job {} failed: {}", update.job_id, reason),
        }
        jobs.write().await.insert(update.job_id, update.status);
    }
}
