//! Download engine.
//!
//! This module provides:
//! - Per-attachment transfer (probe, fingerprint claim, ranged resume)
//! - Batch scheduling with throttle backoff
//! - Outcome tallies
//! - The end-to-end creator pull

pub mod pull;
pub mod scheduler;
pub mod state;
pub mod transfer;

pub use pull::{dump_path, dump_posts, pull_creator, PullSummary};
pub use scheduler::{download, BatchSummary, DownloadReport};
pub use state::{DownloadTally, TransferOutcome, TransferStatus};
pub use transfer::{transfer_attachment, TransferOptions};
