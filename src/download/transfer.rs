//! Per-attachment transfer: probe, claim the fingerprint, then stream the
//! body in ranged windows with bounded retries.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{header, Response, StatusCode};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::api::PartyApi;
use crate::dedup::{Claim, EtagStore};
use crate::download::state::TransferStatus;
use crate::error::{Error, Result};
use crate::fs::{destination_path, existing_len};
use crate::media::AttachmentRef;
use crate::output::TransferProgress;

/// Bytes requested per ranged GET.
pub const DEFAULT_WINDOW_SIZE: u64 = 100 * 1024 * 1024;

/// Transport-error re-attempts per attachment.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Per-file transfer policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Re-probe files that already exist instead of trusting local presence.
    pub full_check: bool,
    /// Refuse files whose declared length exceeds this many bytes.
    pub size_limit: Option<u64>,
    pub window_size: u64,
    pub max_retries: u32,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            full_check: false,
            size_limit: None,
            window_size: DEFAULT_WINDOW_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// What a probe reported about the remote file.
#[derive(Debug, Clone)]
struct ProbeInfo {
    fingerprint: String,
    total: Option<u64>,
    last_modified: Option<SystemTime>,
}

/// How a run of ranged GETs ended without a transport or local error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowsEnd {
    Complete,
    RangeNotSatisfiable,
    Throttled,
    Rejected(StatusCode),
}

/// Transfer one attachment into the store's directory.
///
/// Never fails: every error is classified into a [`TransferStatus`].
/// `force_verify` behaves like `full_check` for this attempt only.
pub async fn transfer_attachment(
    api: &PartyApi,
    store: &EtagStore,
    attachment: &AttachmentRef,
    options: &TransferOptions,
    force_verify: bool,
    progress: &TransferProgress,
) -> TransferStatus {
    let filename = attachment.filename();
    match try_transfer(api, store, attachment, options, force_verify, progress).await {
        Ok(status) => {
            tracing::debug!("{}: {}", filename, status);
            status
        }
        Err(e) => {
            let status = status_for_error(&e);
            tracing::debug!("{}: {} ({})", filename, status, e);
            status
        }
    }
}

async fn try_transfer(
    api: &PartyApi,
    store: &EtagStore,
    attachment: &AttachmentRef,
    options: &TransferOptions,
    force_verify: bool,
    progress: &TransferProgress,
) -> Result<TransferStatus> {
    let path = destination_path(store.directory(), &attachment.filename())?;
    let verify = options.full_check || force_verify;

    if !verify && path.exists() {
        return Ok(TransferStatus::AlreadyExists);
    }

    let url = api.file_url(&attachment.remote_path, &attachment.name)?;

    let response = api.probe(&url).await?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(TransferStatus::Throttled);
    }
    let Some(info) = probe_info(&response) else {
        tracing::debug!("Probe of {} returned {} without a fingerprint", url, status);
        return Ok(TransferStatus::OtherError);
    };

    let too_large = matches!(
        (options.size_limit, info.total),
        (Some(limit), Some(total)) if total > limit
    );
    let inserted = match store.claim(&info.fingerprint, path.exists(), too_large).await {
        Claim::Duplicate => return Ok(TransferStatus::DuplicateContent),
        Claim::TooLarge => return Ok(TransferStatus::TooLarge),
        Claim::Granted { inserted } => inserted,
    };

    let status = transfer_with_retries(api, &url, &path, &info, options, progress).await;
    if inserted && status.is_failure() {
        store.remove(&info.fingerprint).await;
    }
    Ok(status)
}

/// Stream the body, resuming from the on-disk length after each transport
/// failure until the retry bound is reached.
async fn transfer_with_retries(
    api: &PartyApi,
    url: &Url,
    path: &Path,
    info: &ProbeInfo,
    options: &TransferOptions,
    progress: &TransferProgress,
) -> TransferStatus {
    let mut retries = 0;

    loop {
        let result =
            stream_windows(api, url, path, info.total, options.window_size, progress).await;
        let error = match result {
            Ok(WindowsEnd::Complete) => {
                if let Some(modified) = info.last_modified {
                    if let Err(e) = set_modified(path, modified) {
                        tracing::debug!("Could not set mtime on {}: {}", path.display(), e);
                    }
                }
                return TransferStatus::Success;
            }
            Ok(WindowsEnd::RangeNotSatisfiable) => return TransferStatus::AlreadyExists,
            Ok(WindowsEnd::Throttled) => return TransferStatus::Throttled,
            Ok(WindowsEnd::Rejected(status)) => {
                tracing::debug!("GET {} rejected with {}", url, status);
                return TransferStatus::OtherError;
            }
            Err(e) => e,
        };

        if !matches!(error, Error::Http(_)) || retries >= options.max_retries {
            tracing::debug!("Giving up on {} after {} retries: {}", path.display(), retries, error);
            return status_for_error(&error);
        }

        retries += 1;
        tracing::debug!(
            "Retrying {} ({}/{}) after: {}",
            path.display(),
            retries,
            options.max_retries,
            error
        );
    }
}

/// Issue ranged GETs from the current on-disk length until the declared total
/// is reached (or, when the total is unknown, until one open-ended GET ends).
async fn stream_windows(
    api: &PartyApi,
    url: &Url,
    path: &Path,
    total: Option<u64>,
    window_size: u64,
    progress: &TransferProgress,
) -> Result<WindowsEnd> {
    let mut offset = existing_len(path)?;

    // Nothing to request for an empty file; a range over it is unsatisfiable.
    if total == Some(0) {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .await?;
        return Ok(WindowsEnd::Complete);
    }

    loop {
        let end = match total {
            Some(total) if offset < total => {
                Some(offset.saturating_add(window_size.max(1)).min(total) - 1)
            }
            _ => None,
        };

        let response = api.fetch_range(url, offset, end).await?;
        let status = response.status();
        match status {
            StatusCode::RANGE_NOT_SATISFIABLE => {
                // Only a local copy at least as long as the remote one is complete.
                let local = existing_len(path)?;
                return Ok(match total {
                    Some(total) if local >= total => WindowsEnd::RangeNotSatisfiable,
                    None if local > 0 => WindowsEnd::RangeNotSatisfiable,
                    _ => WindowsEnd::Rejected(status),
                });
            }
            StatusCode::TOO_MANY_REQUESTS => return Ok(WindowsEnd::Throttled),
            s if !s.is_success() => return Ok(WindowsEnd::Rejected(s)),
            _ => {}
        }

        // A full body in reply to a ranged request replaces the partial file.
        let restart = status != StatusCode::PARTIAL_CONTENT;
        if restart && offset > 0 {
            tracing::debug!("Server ignored range for {}, restarting", path.display());
            offset = 0;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(!restart)
            .truncate(restart)
            .open(path)
            .await?;

        let window_start = offset;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            offset += chunk.len() as u64;
            progress.update(chunk.len() as u64);
        }
        file.flush().await?;

        match total {
            Some(total) if offset < total && !restart && offset > window_start => continue,
            Some(total) if offset < total => {
                return Err(Error::Download(format!(
                    "Body ended at {} of {} bytes",
                    offset, total
                )))
            }
            _ => return Ok(WindowsEnd::Complete),
        }
    }
}

/// Map an error that escaped the transfer to its terminal status.
fn status_for_error(error: &Error) -> TransferStatus {
    match error {
        Error::Io(_) => TransferStatus::LocalIoError,
        e if e.is_timeout() => TransferStatus::Timeout,
        _ => TransferStatus::OtherError,
    }
}

fn probe_info(response: &Response) -> Option<ProbeInfo> {
    let headers = response.headers();
    let fingerprint = headers
        .get(header::ETAG)?
        .to_str()
        .ok()
        .filter(|v| !v.is_empty())?
        .to_string();

    Some(ProbeInfo {
        fingerprint,
        total: declared_length(response),
        last_modified: headers
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date),
    })
}

/// Content length from the header itself; HEAD responses carry no body, so
/// the client's own body length is not meaningful here.
fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn parse_http_date(value: &str) -> Option<SystemTime> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| SystemTime::from(dt.with_timezone(&Utc)))
}

fn set_modified(path: &Path, modified: SystemTime) -> std::io::Result<()> {
    std::fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(modified)
}
