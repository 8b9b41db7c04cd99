//! Path and directory management.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the fetched-posts artefact.
pub const POSTS_FILE: &str = ".posts";

/// Name of the embeds artefact.
pub const EMBEDDED_FILE: &str = ".embedded";

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Resolve `filename` inside `directory`.
///
/// The filename must be a single normal path component.
pub fn destination_path(directory: &Path, filename: &str) -> Result<PathBuf> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !filename.contains(['/', '\\']) => {
            Ok(directory.join(filename))
        }
        _ => Err(Error::InvalidFilename(filename.to_string())),
    }
}

/// Size of the file at `path`, or 0 if it does not exist.
///
/// Anything other than a regular file at `path` is an error.
pub fn existing_len(path: &Path) -> Result<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{} exists and is not a regular file", path.display()),
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::Io(e)),
    }
}
