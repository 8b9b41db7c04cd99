//! Persisted content fingerprint cache.
//!
//! Fingerprints are the server's ETag values. A fingerprint in the cache means
//! content with that signature was already mirrored into the directory, by this
//! run or an earlier one. On disk the cache is a JSON array in `.etags`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Name of the cache file inside a destination directory.
pub const ETAGS_FILE: &str = ".etags";

/// In-memory set of seen fingerprints.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FingerprintCache {
    fingerprints: HashSet<String>,
}

impl FingerprintCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the cache for `directory`. A missing file yields an empty cache.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(ETAGS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let fingerprints: Vec<String> =
            serde_json::from_str(&content).map_err(|e| Error::CorruptCache {
                path: path.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!("Loaded {} fingerprints from {}", fingerprints.len(), path.display());
        Ok(Self {
            fingerprints: fingerprints.into_iter().collect(),
        })
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    /// Insert; returns `true` if the fingerprint was not present before.
    pub fn add(&mut self, fingerprint: impl Into<String>) -> bool {
        self.fingerprints.insert(fingerprint.into())
    }

    /// Remove; returns `true` if the fingerprint was present.
    pub fn remove(&mut self, fingerprint: &str) -> bool {
        self.fingerprints.remove(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Serialize the set as a sorted JSON array.
    fn to_json(&self) -> Result<String> {
        let mut sorted: Vec<&String> = self.fingerprints.iter().collect();
        sorted.sort();
        Ok(serde_json::to_string(&sorted)?)
    }

    /// Atomically rewrite the cache file in `directory`.
    pub fn persist(&self, directory: &Path) -> Result<()> {
        write_atomic(directory, &self.to_json()?)
    }
}

/// Write to a temp file beside the target, then rename over it.
fn write_atomic(directory: &Path, content: &str) -> Result<()> {
    let target = directory.join(ETAGS_FILE);
    let temp = directory.join(format!("{}.{}.tmp", ETAGS_FILE, uuid::Uuid::new_v4()));

    std::fs::write(&temp, content)?;
    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(Error::Io(e));
    }
    Ok(())
}

/// Outcome of trying to claim a fingerprint before a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// Already mirrored under another name; skip.
    Duplicate,
    /// Over the size cutoff; skip.
    TooLarge,
    /// Proceed. `inserted` says whether this attempt added the fingerprint
    /// and therefore owns its rollback.
    Granted { inserted: bool },
}

/// Fingerprint cache shared by every in-flight transfer of one directory.
///
/// Lookups and updates are serialized behind one lock; disk writes are
/// serialized behind another so concurrent persists never interleave.
#[derive(Debug)]
pub struct EtagStore {
    directory: PathBuf,
    cache: Mutex<FingerprintCache>,
    write_lock: Mutex<()>,
}

impl EtagStore {
    /// Load the cache for `directory`.
    pub fn open(directory: &Path) -> Result<Self> {
        Ok(Self::with_cache(directory, FingerprintCache::load(directory)?))
    }

    /// Wrap an existing cache.
    pub fn with_cache(directory: &Path, cache: FingerprintCache) -> Self {
        Self {
            directory: directory.to_path_buf(),
            cache: Mutex::new(cache),
            write_lock: Mutex::new(()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn contains(&self, fingerprint: &str) -> bool {
        self.cache.lock().await.contains(fingerprint)
    }

    pub async fn add(&self, fingerprint: &str) -> bool {
        self.cache.lock().await.add(fingerprint)
    }

    pub async fn remove(&self, fingerprint: &str) -> bool {
        self.cache.lock().await.remove(fingerprint)
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Decide, under one lock, whether a probed file may be transferred.
    ///
    /// A known fingerprint whose destination is absent is a duplicate. Files
    /// over the cutoff are refused. Otherwise the fingerprint is recorded
    /// speculatively.
    pub async fn claim(&self, fingerprint: &str, destination_exists: bool, too_large: bool) -> Claim {
        let mut cache = self.cache.lock().await;

        if cache.contains(fingerprint) && !destination_exists {
            return Claim::Duplicate;
        }
        if too_large {
            return Claim::TooLarge;
        }

        Claim::Granted {
            inserted: cache.add(fingerprint),
        }
    }

    /// Rewrite the on-disk cache with the current set.
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let content = self.cache.lock().await.to_json()?;

        let directory = self.directory.clone();
        tokio::task::spawn_blocking(move || write_atomic(&directory, &content))
            .await
            .map_err(|e| Error::Download(format!("Fingerprint persist task failed: {}", e)))?
    }
}
