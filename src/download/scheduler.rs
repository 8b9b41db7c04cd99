//! Batch scheduler with a decaying concurrency ceiling.
//!
//! Every pending attachment in a batch is dispatched at once and waits on a
//! semaphore sized to the current ceiling. A throttled transfer is requeued
//! for the next batch and forgets its permit, shrinking the ceiling for the
//! rest of the batch (never below one slot). Each following batch starts one
//! slot lower than the last, down to one. The run ends with the first batch
//! that requeues nothing.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::api::PartyApi;
use crate::dedup::EtagStore;
use crate::download::state::{DownloadTally, TransferOutcome, TransferStatus};
use crate::download::transfer::{transfer_attachment, TransferOptions};
use crate::error::Result;
use crate::fs::ensure_dir;
use crate::media::AttachmentRef;
use crate::output::TransferProgress;

/// What one batch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Ceiling the batch started with.
    pub ceiling: usize,
    pub dispatched: usize,
    pub throttled: usize,
}

/// Result of a full scheduler run.
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Terminal outcomes, one per attachment.
    pub outcomes: Vec<TransferOutcome>,
    pub batches: Vec<BatchSummary>,
    /// Ceiling of the last batch.
    pub final_ceiling: usize,
}

impl DownloadReport {
    pub fn tally(&self) -> DownloadTally {
        DownloadTally::from_outcomes(&self.outcomes)
    }
}

/// Per-batch concurrency limiter.
struct BatchLimiter {
    semaphore: Semaphore,
    /// Slots not yet given up to throttling.
    remaining: AtomicUsize,
}

impl BatchLimiter {
    fn new(ceiling: usize) -> Self {
        Self {
            semaphore: Semaphore::new(ceiling),
            remaining: AtomicUsize::new(ceiling),
        }
    }

    /// Claim the right to drop one slot, if more than one is left.
    fn try_shrink(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n > 1).then(|| n - 1))
            .is_ok()
    }
}

/// Download every attachment into `directory`.
///
/// Only failures to prepare the directory or read its fingerprint cache are
/// returned as errors; per-file failures become outcomes.
pub async fn download(
    api: &PartyApi,
    directory: &Path,
    attachments: Vec<AttachmentRef>,
    workers: usize,
    options: &TransferOptions,
    progress: &TransferProgress,
) -> Result<DownloadReport> {
    ensure_dir(directory)?;
    let store = EtagStore::open(directory)?;

    let mut report = DownloadReport::default();
    let mut ceiling = workers.max(1);
    let mut pending = attachments;
    let mut force_verify = false;

    while !pending.is_empty() {
        tracing::info!(
            "Batch {}: {} files, {} workers",
            report.batches.len() + 1,
            pending.len(),
            ceiling
        );

        let dispatched = pending.len();
        let limiter = BatchLimiter::new(ceiling);
        let statuses = join_all(pending.iter().map(|attachment| {
            run_one(api, &store, &limiter, attachment, options, force_verify, progress)
        }))
        .await;

        let mut requeued = Vec::new();
        for (attachment, status) in pending.into_iter().zip(statuses) {
            if status.is_requeue() {
                requeued.push(attachment);
            } else {
                report
                    .outcomes
                    .push(TransferOutcome::new(attachment.filename(), status));
            }
        }

        report.batches.push(BatchSummary {
            ceiling,
            dispatched,
            throttled: requeued.len(),
        });
        report.final_ceiling = ceiling;

        if requeued.is_empty() {
            break;
        }

        tracing::info!("{} files throttled, requeueing", requeued.len());
        if ceiling > 1 {
            ceiling -= 1;
        }
        // Requeued files may have been partially written before the throttle.
        force_verify = true;
        pending = requeued;
    }

    if let Err(e) = store.persist().await {
        tracing::warn!("Failed to save fingerprint cache: {}", e);
    }

    Ok(report)
}

async fn run_one(
    api: &PartyApi,
    store: &EtagStore,
    limiter: &BatchLimiter,
    attachment: &AttachmentRef,
    options: &TransferOptions,
    force_verify: bool,
    progress: &TransferProgress,
) -> TransferStatus {
    let permit = match limiter.semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return TransferStatus::OtherError,
    };

    let status = transfer_attachment(api, store, attachment, options, force_verify, progress).await;

    if status.is_requeue() {
        if limiter.try_shrink() {
            permit.forget();
        }
        return status;
    }
    drop(permit);

    progress.item_done(&attachment.filename());
    if status == TransferStatus::Success {
        if let Err(e) = store.persist().await {
            tracing::warn!("Failed to save fingerprint cache: {}", e);
        }
    }
    status
}
