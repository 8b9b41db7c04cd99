//! Filesystem module.
//!
//! Provides:
//! - Destination path and directory management
//! - Filename templating, slugging and name dedup

pub mod naming;
pub mod paths;

pub use naming::{
    dedup_by_filename, format_filename, format_filenames, sanitize_filename, slugify,
    template_fields, DEFAULT_FILE_FORMAT,
};
pub use paths::{destination_path, ensure_dir, existing_len, EMBEDDED_FILE, POSTS_FILE};
