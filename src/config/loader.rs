//! Configuration structures and loading logic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{ClientSettings, Creator, DEFAULT_USER_AGENT};
use crate::config::modes::Site;
use crate::download::TransferOptions;
use crate::error::{Error, Result};
use crate::fs::naming::{
    DEFAULT_FILE_FORMAT, ORDERED_SHORT_FORMAT, POST_ID_FORMAT, POST_TITLE_FORMAT,
};

/// Default template as older `.info` files spell it.
const LEGACY_DEFAULT_FILE_FORMAT: &str = "{ref.filename}";

/// Name of the per-directory pull info file.
pub const INFO_FILE: &str = ".info";

/// Application configuration file (TOML).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sites: SitesConfig,

    #[serde(default)]
    pub options: DefaultsConfig,
}

/// Base URLs for the supported site families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitesConfig {
    #[serde(default = "default_kemono")]
    pub kemono: String,

    #[serde(default = "default_coomer")]
    pub coomer: String,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            kemono: default_kemono(),
            coomer: default_coomer(),
        }
    }
}

/// Defaults applied when the command line leaves a value unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Concurrent transfers for a fresh pull.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Concurrent transfers for `update`.
    #[serde(default = "default_update_workers")]
    pub update_workers: usize,

    /// Overall per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Socket connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Browser user agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            update_workers: default_update_workers(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_kemono() -> String {
    "https://kemono.su".to_string()
}

fn default_coomer() -> String {
    "https://coomer.su".to_string()
}

fn default_workers() -> usize {
    32
}

fn default_update_workers() -> usize {
    4
}

fn default_timeout() -> u64 {
    60 * 60
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_size_limit() -> i64 {
    -1
}

fn default_file_format() -> String {
    DEFAULT_FILE_FORMAT.to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("Configuration file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Default location of the configuration file.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "party-downloader")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("party-downloader.toml"))
    }

    /// Base URL for a site family.
    pub fn site_url(&self, site: Site) -> &str {
        match site {
            Site::Kemono => &self.sites.kemono,
            Site::Coomer => &self.sites.coomer,
        }
    }

    /// HTTP session settings derived from the defaults section.
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            timeout: Duration::from_secs(self.options.timeout_secs),
            connect_timeout: Duration::from_secs(self.options.connect_timeout_secs),
            user_agent: self.options.user_agent.clone(),
        }
    }
}

/// Immutable options snapshot for one pull.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "StoredRunOptions")]
pub struct RunOptions {
    /// Site base URL.
    pub site: String,

    /// Destination directory.
    pub directory: Option<PathBuf>,

    /// Concurrency ceiling at the start of the run.
    pub workers: usize,

    /// Size cutoff in megabytes; `-1` disables it.
    pub size_limit: i64,

    /// Re-probe files that already exist locally.
    pub full_check: bool,

    /// Extensions to skip (suffix match on the declared name).
    pub exclude_extensions: Vec<String>,

    /// Drop attachments that point at external links.
    pub exclude_external: bool,

    /// Include each post's primary file.
    pub files: bool,

    /// Output filename template.
    pub file_format: String,

    /// Slug the base of generated filenames.
    pub sluglify: bool,

    /// Maximum number of posts to walk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            site: default_kemono(),
            directory: None,
            workers: default_workers(),
            size_limit: default_size_limit(),
            full_check: false,
            exclude_extensions: Vec::new(),
            exclude_external: true,
            files: true,
            file_format: default_file_format(),
            sluglify: false,
            limit: None,
        }
    }
}

/// `RunOptions` as found in `.info` files, old spellings included.
///
/// Older files name the preset through `post_id`, `post_title` or
/// `ordered_short` flags instead of a template.
#[derive(Deserialize)]
struct StoredRunOptions {
    #[serde(alias = "base_url", default)]
    site: String,
    #[serde(default)]
    directory: Option<PathBuf>,
    #[serde(default = "default_workers")]
    workers: usize,
    #[serde(default = "default_size_limit")]
    size_limit: i64,
    #[serde(default)]
    full_check: bool,
    #[serde(alias = "ignore_extensions", default, deserialize_with = "null_as_empty")]
    exclude_extensions: Vec<String>,
    #[serde(default = "default_true")]
    exclude_external: bool,
    #[serde(alias = "include_files", default = "default_true")]
    files: bool,
    #[serde(default)]
    file_format: Option<String>,
    #[serde(default)]
    sluglify: bool,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default, deserialize_with = "null_as_false")]
    post_id: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    post_title: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    ordered_short: bool,
}

impl StoredRunOptions {
    fn preset(&self) -> Option<&'static str> {
        if self.post_id {
            Some(POST_ID_FORMAT)
        } else if self.post_title {
            Some(POST_TITLE_FORMAT)
        } else if self.ordered_short {
            Some(ORDERED_SHORT_FORMAT)
        } else {
            None
        }
    }
}

impl From<StoredRunOptions> for RunOptions {
    fn from(stored: StoredRunOptions) -> Self {
        // A flag only wins over a template that still names the plain filename.
        let explicit = stored
            .file_format
            .as_deref()
            .filter(|f| *f != DEFAULT_FILE_FORMAT && *f != LEGACY_DEFAULT_FILE_FORMAT);
        let file_format = match (explicit, stored.preset()) {
            (Some(format), _) => format.to_string(),
            (None, Some(preset)) => preset.to_string(),
            (None, None) => default_file_format(),
        };

        Self {
            site: stored.site,
            directory: stored.directory,
            workers: stored.workers,
            size_limit: stored.size_limit,
            full_check: stored.full_check,
            exclude_extensions: stored.exclude_extensions,
            exclude_external: stored.exclude_external,
            files: stored.files,
            file_format,
            sluglify: stored.sluglify,
            limit: stored.limit,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

impl RunOptions {
    /// Size cutoff in bytes, if one is set.
    pub fn size_limit_bytes(&self) -> Option<u64> {
        u64::try_from(self.size_limit)
            .ok()
            .map(|mb| mb.saturating_mul(1024 * 1024))
    }

    /// Per-file transfer policy for this run.
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            full_check: self.full_check,
            size_limit: self.size_limit_bytes(),
            ..TransferOptions::default()
        }
    }

    /// Destination directory, defaulting to the creator's name.
    pub fn directory_for(&self, creator: &Creator) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::fs::naming::sanitize_filename(&creator.name)))
    }
}

/// What `{directory}/.info` holds: who was pulled and how.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullInfo {
    pub user: Creator,
    pub options: RunOptions,
}

impl PullInfo {
    /// Read the info file in `directory`.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(INFO_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!("No pull info found at {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?;

        Ok(serde_json::from_str(&content)?)
    }

    /// Write the info file into `directory`.
    pub fn save(&self, directory: &Path) -> Result<()> {
        let content = serde_json::to_string(self)?;
        fs::write(directory.join(INFO_FILE), content)?;
        Ok(())
    }
}
