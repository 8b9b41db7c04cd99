//! Configuration module for the party-downloader.
//!
//! This module handles:
//! - Loading defaults from a TOML file
//! - The per-run options snapshot and its `.info` persistence
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{Config, DefaultsConfig, PullInfo, RunOptions, SitesConfig, INFO_FILE};
pub use modes::Site;
pub use validation::{
    unhosted_service, validate_run_options, validate_service, validate_site_url,
};
