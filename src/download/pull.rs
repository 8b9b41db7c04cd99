//! Full pull of one creator: listing, artefacts, extraction, download.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::api::{Creator, PartyApi, PostSource};
use crate::config::{validate_run_options, PullInfo, RunOptions};
use crate::download::scheduler::{download, DownloadReport};
use crate::error::Result;
use crate::fs::{ensure_dir, sanitize_filename, EMBEDDED_FILE, POSTS_FILE};
use crate::media::{collect_embeds, prepare_attachments};
use crate::output::{create_spinner, TransferProgress};

/// What a pull did.
#[derive(Debug, Clone)]
pub struct PullSummary {
    pub directory: PathBuf,
    pub posts: usize,
    pub attachments: usize,
    pub report: DownloadReport,
}

/// Pull `creator` according to `options`.
///
/// Posts come from `source`; files are fetched through `api`. Progress bars
/// are drawn only when `show_progress` is set.
pub async fn pull_creator(
    api: &PartyApi,
    source: &dyn PostSource,
    creator: &Creator,
    options: &RunOptions,
    show_progress: bool,
) -> Result<PullSummary> {
    validate_run_options(options)?;

    let directory = options.directory_for(creator);
    ensure_dir(&directory)?;

    let info = PullInfo {
        user: creator.clone(),
        options: RunOptions {
            directory: Some(directory.clone()),
            ..options.clone()
        },
    };
    info.save(&directory)?;

    tracing::info!(
        "Pulling {} ({}/{}) into {}",
        creator.name,
        creator.service,
        creator.id,
        directory.display()
    );

    let spinner = show_progress.then(|| create_spinner("Fetching posts..."));
    let posts = source.fetch_posts(creator, options.limit).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let posts = posts?;
    tracing::info!("Fetched {} posts", posts.len());

    write_json(&directory.join(POSTS_FILE), &posts)?;
    let embeds = collect_embeds(&posts);
    if !embeds.is_empty() {
        write_json(&directory.join(EMBEDDED_FILE), &embeds)?;
    }

    let attachments = prepare_attachments(&posts, options)?;
    let count = attachments.len();
    tracing::info!("{} files to check", count);

    let progress = if show_progress {
        TransferProgress::new(count as u64)
    } else {
        TransferProgress::hidden()
    };
    let report = download(
        api,
        &directory,
        attachments,
        options.workers,
        &options.transfer_options(),
        &progress,
    )
    .await?;
    progress.finish();

    Ok(PullSummary {
        directory,
        posts: posts.len(),
        attachments: count,
        report,
    })
}

/// Where `dump-posts` writes: `{name}/.posts`, or `.posts_{name}` in `base`
/// when `in_directory` is off.
pub fn dump_path(base: &Path, name: &str, in_directory: bool) -> PathBuf {
    let name = sanitize_filename(name);
    if in_directory {
        base.join(name).join(POSTS_FILE)
    } else {
        base.join(format!("{}_{}", POSTS_FILE, name))
    }
}

/// Write up to `limit` of the creator's posts to `output` as JSON, creating
/// its parent folder. Returns the number of posts written.
pub async fn dump_posts(
    source: &dyn PostSource,
    creator: &Creator,
    limit: Option<usize>,
    output: &Path,
) -> Result<usize> {
    if let Some(parent) = output.parent() {
        ensure_dir(parent)?;
    }
    let posts = source.fetch_posts(creator, limit).await?;
    write_json(output, &posts)?;
    tracing::info!("Wrote {} posts to {}", posts.len(), output.display());
    Ok(posts.len())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string(value)?;
    std::fs::write(path, content)?;
    Ok(())
}
