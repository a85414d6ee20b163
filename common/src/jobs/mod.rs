use crate::model::summary::RunSummary;
use serde::Serialize;

/// Lifecycle of a background import job.
///
/// `InProgress` carries the number of documents committed so far, `Completed`
/// the final run summary.
#[derive(Clone, Debug, Serialize)]
pub enum JobStatus {
    Pending,
    InProgress(u64),
    Completed(RunSummary),
    Failed(String),
}
