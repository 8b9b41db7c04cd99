//! Content deduplication.
//!
//! Provides the persisted fingerprint (ETag) cache shared by concurrent
//! transfers of one destination directory.

pub mod etags;

pub use etags::{Claim, EtagStore, FingerprintCache, ETAGS_FILE};
