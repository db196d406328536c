//! Batch enrichment.
//!
//! Records are processed one at a time with a fixed pause between them. A
//! failing record is logged and counted; it never stops the batch. Work already
//! committed for earlier records stays committed if the batch task is aborted.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::enrich::Enricher;
use crate::error::EnrichError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Scheduler-facing unit of batch work.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub job_id: Uuid,
    pub record_ids: Vec<i64>,
    pub actor_id: Option<String>,
    pub request: String,
}

impl BatchJob {
    pub fn new(record_ids: Vec<i64>, actor_id: Option<String>, request: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            record_ids,
            actor_id,
            request: request.into(),
        }
    }
}

/// Run `request` against every record in order.
pub async fn run_batch(enricher: &Enricher, record_ids: &[i64], request: &str) -> BatchSummary {
    let mut summary = BatchSummary {
        total: record_ids.len(),
        ..BatchSummary::default()
    };
    let delay = enricher.config().batch_delay();

    for (index, &record_id) in record_ids.iter().enumerate() {
        log::info!("Processing record {}/{} (id {})", index + 1, summary.total, record_id);

        match enricher.process_request(record_id, request).await {
            Ok(outcome) => {
                summary.processed += 1;
                log::info!(
                    "Record {} processed ({}): {}",
                    record_id,
                    outcome.action,
                    outcome.message
                );
            }
            Err(EnrichError::RecordNotFound(id)) => {
                summary.skipped += 1;
                log::warn!("Record not found, skipping: {}", id);
                continue;
            }
            Err(e) => {
                summary.errors += 1;
                log::error!(
                    "Failed to process record {} (request '{}'): {}",
                    record_id,
                    request,
                    e
                );
            }
        }

        if index + 1 < record_ids.len() && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    log::info!(
        "Batch finished: {} total, {} processed, {} skipped, {} errors",
        summary.total,
        summary.processed,
        summary.skipped,
        summary.errors
    );
    summary
}

pub async fn run_batch_job(enricher: &Enricher, job: &BatchJob) -> BatchSummary {
    log::info!(
        "Batch job {} started: {} records, actor {}",
        job.job_id,
        job.record_ids.len(),
        job.actor_id.as_deref().unwrap_or("-")
    );
    let summary = run_batch(enricher, &job.record_ids, &job.request).await;
    log::info!("Batch job {} completed", job.job_id);
    summary
}

/// Run a job on a background task. Aborting the handle stops after the
/// current record's writes.
pub fn spawn_batch(enricher: Arc<Enricher>, job: BatchJob) -> tokio::task::JoinHandle<BatchSummary> {
    tokio::spawn(async move { run_batch_job(&enricher, &job).await })
}

/// Await a spawned job, logging a task that died as a failed batch.
pub async fn join_batch(handle: tokio::task::JoinHandle<BatchSummary>, job_id: Uuid) -> Option<BatchSummary> {
    match handle.await {
        Ok(summary) => Some(summary),
        Err(e) if e.is_cancelled() => {
            log::warn!("Batch job {} was cancelled", job_id);
            None
        }
        Err(e) => {
            log::error!("Batch job {} failed completely: {}", job_id, e);
            None
        }
    }
}
