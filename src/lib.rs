//! Party Downloader - mirror creators from kemono/coomer style sites.
//!
//! This library lists a creator's posts, extracts their attachments and
//! downloads them into a local folder that can be re-synced cheaply.
//!
//! # Features
//!
//! - Creator lookup and paginated post listing
//! - Filename templates with slugging and name dedup
//! - Content dedup through a persisted ETag cache
//! - Ranged, resumable transfers with bounded retries
//! - Throttle-aware batch scheduling with a decaying worker ceiling
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use party_downloader::{download, ClientSettings, PartyApi, TransferOptions, TransferProgress};
//! use party_downloader::media::AttachmentRef;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = PartyApi::new("https://kemono.su", &ClientSettings::default())?;
//!     let files = vec![AttachmentRef::new("cover.png", "/ab/cd/abcd.png")];
//!
//!     let report = download(
//!         &api,
//!         Path::new("artist"),
//!         files,
//!         4,
//!         &TransferOptions::default(),
//!         &TransferProgress::hidden(),
//!     )
//!     .await?;
//!     println!("{:?}", report.tally());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;

// Re-exports for convenience
pub use api::{ClientSettings, Creator, PartyApi, Post, PostSource};
pub use config::{Config, PullInfo, RunOptions, Site};
pub use dedup::{EtagStore, FingerprintCache};
pub use download::{
    download, pull_creator, transfer_attachment, DownloadReport, DownloadTally, TransferOptions,
    TransferOutcome, TransferStatus,
};
pub use error::{Error, Result};
pub use media::AttachmentRef;
pub use output::TransferProgress;
