//! Command-line argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{validate_site_url, Config, RunOptions, Site};
use crate::error::{Error, Result};
use crate::fs::naming::{
    DEFAULT_FILE_FORMAT, ORDERED_SHORT_FORMAT, POST_ID_FORMAT, POST_TITLE_FORMAT,
};

/// Party site mirroring CLI.
#[derive(Parser, Debug)]
#[command(
    name = "party-dl",
    version,
    about = "Mirror creator posts and attachments from kemono/coomer style sites",
    long_about = "A CLI tool to mirror a creator's attachments into a local folder.\n\n\
                  Re-running a pull only fetches what is missing; `update` re-runs a previous pull."
)]
pub struct Args {
    /// Log at DEBUG level to the console instead of writing a debug log file.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "PARTY_DL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pull a creator from kemono.
    Kemono(PullArgs),

    /// Pull a creator from coomer (onlyfans, fansly, candfans).
    Coomer(PullArgs),

    /// Re-run an earlier pull from the `.info` file in its folder.
    Update {
        /// Folder of an earlier pull.
        folder: PathBuf,

        /// Number of posts to parse, newest first.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of concurrent downloads.
        #[arg(short, long)]
        workers: Option<usize>,

        /// Re-probe files that already exist.
        #[arg(long)]
        full_check: bool,
    },

    /// Search the creator index by name, optionally pulling a result.
    Search(SearchArgs),

    /// Show post, attachment and file counts for a creator.
    Details {
        /// Service to pull from, e.g. patreon, fanbox, onlyfans.
        service: String,

        /// Creator id or name.
        user: String,

        /// Site to query: kemono, coomer or a base URL.
        #[arg(short, long, default_value = "kemono")]
        site: String,

        /// File extension to exclude from the counts.
        #[arg(short = 'e', long = "exclude-extension")]
        exclude_extensions: Vec<String>,
    },

    /// Print a creator's non-empty embeds as JSON.
    EmbeddedLinks {
        /// Service to query, e.g. patreon, fanbox, onlyfans.
        service: String,

        /// Creator id or name.
        user: String,

        /// Site to query: kemono, coomer or a base URL.
        #[arg(short, long, default_value = "kemono")]
        site: String,
    },

    /// Write the full posts JSON without downloading anything.
    DumpPosts {
        /// Service to query, e.g. patreon, fanbox, onlyfans.
        service: String,

        /// Creator id from the URL.
        user: String,

        /// Creator name; also names the output folder.
        #[arg(long)]
        name: String,

        /// Site to query: kemono, coomer or a base URL.
        #[arg(short, long, default_value = "kemono")]
        site: String,

        /// Number of posts to dump, newest first.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Write `.posts_{name}` in the working directory instead of
        /// `{name}/.posts`.
        #[arg(long)]
        no_directory: bool,
    },

    /// Print every match of a regex over post contents as JSON.
    CustomParse {
        /// Service to query, e.g. patreon, fanbox, onlyfans.
        service: String,

        /// Creator id or name.
        user: String,

        /// Regular expression; with one capture group, the group is printed.
        pattern: String,

        /// Site to query: kemono, coomer or a base URL.
        #[arg(short, long, default_value = "kemono")]
        site: String,

        /// Number of posts to scan, newest first.
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Arguments for `search`.
#[derive(clap::Args, Debug, Clone)]
pub struct SearchArgs {
    /// Case-insensitive substring of the creator name.
    pub query: String,

    /// Site to search: kemono, coomer or a base URL.
    pub site: String,

    /// Only list creators from this service.
    #[arg(long)]
    pub service: Option<String>,

    /// Prompt for a result index and pull that creator with post id naming.
    #[arg(short, long)]
    pub interactive: bool,

    /// Number of posts to parse when pulling, newest first.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Number of concurrent downloads when pulling.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output directory when pulling (defaults to the creator name).
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// File extension to exclude when pulling (repeatable).
    #[arg(short = 'e', long = "exclude-extension")]
    pub exclude_extensions: Vec<String>,

    /// Keep attachments that point at external links when pulling.
    #[arg(long)]
    pub include_external: bool,
}

impl SearchArgs {
    /// Options for pulling a creator picked from the results.
    pub fn run_options(&self, config: &Config, site: &str) -> RunOptions {
        RunOptions {
            site: site.to_string(),
            directory: self.directory.clone(),
            workers: self.workers.unwrap_or(config.options.workers),
            exclude_extensions: self.exclude_extensions.clone(),
            exclude_external: !self.include_external,
            file_format: POST_ID_FORMAT.to_string(),
            limit: self.limit,
            ..RunOptions::default()
        }
    }
}

/// Arguments shared by the `kemono` and `coomer` pulls.
#[derive(clap::Args, Debug, Clone)]
pub struct PullArgs {
    /// Service to pull from, e.g. patreon, fanbox, onlyfans.
    pub service: String,

    /// Creator id from the URL, or a name from search.
    pub user: String,

    /// Site base URL or family name; defaults to the subcommand's site.
    #[arg(short, long)]
    pub site: Option<String>,

    /// Creator name; skips the creator index lookup when `user` is an id.
    #[arg(long)]
    pub name: Option<String>,

    /// Output directory (defaults to the creator name).
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Number of posts to parse, newest first.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Number of concurrent downloads.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// File extension to exclude (repeatable).
    #[arg(short = 'e', long = "exclude-extension")]
    pub exclude_extensions: Vec<String>,

    /// Skip each post's primary file.
    #[arg(long)]
    pub no_files: bool,

    /// Keep attachments that point at external links.
    #[arg(long)]
    pub include_external: bool,

    /// Name files `{post_id}_{filename}`.
    #[arg(long, conflicts_with_all = ["post_title", "ordered_short", "file_format"])]
    pub post_id: bool,

    /// Name files `{post_title}_{filename}`.
    #[arg(long, conflicts_with_all = ["ordered_short", "file_format"])]
    pub post_title: bool,

    /// Name files `{post_id}_{index:03}.{extension}`.
    #[arg(long, conflicts_with = "file_format")]
    pub ordered_short: bool,

    /// Custom filename template over post_id, post_title, filename, name,
    /// index and extension, e.g. `{post_id}_{index:03}_{filename}`.
    #[arg(long)]
    pub file_format: Option<String>,

    /// Skip files larger than this many megabytes (-1 for no limit).
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub size_limit: i64,

    /// Slug generated filenames.
    #[arg(long)]
    pub sluglify: bool,

    /// Re-probe files that already exist.
    #[arg(long)]
    pub full_check: bool,
}

impl PullArgs {
    /// Template selected by the preset flags or `--file-format`.
    pub fn file_format(&self) -> String {
        if self.post_id {
            POST_ID_FORMAT.to_string()
        } else if self.post_title {
            POST_TITLE_FORMAT.to_string()
        } else if self.ordered_short {
            ORDERED_SHORT_FORMAT.to_string()
        } else {
            self.file_format
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_FORMAT.to_string())
        }
    }

    /// Build the run snapshot, filling unset values from `config`.
    pub fn run_options(&self, config: &Config, default_site: Site) -> Result<RunOptions> {
        Ok(RunOptions {
            site: resolve_site(config, self.site.as_deref().unwrap_or(""), default_site)?,
            directory: self.directory.clone(),
            workers: self.workers.unwrap_or(config.options.workers),
            size_limit: self.size_limit,
            full_check: self.full_check,
            exclude_extensions: self.exclude_extensions.clone(),
            exclude_external: !self.include_external,
            files: !self.no_files,
            file_format: self.file_format(),
            sluglify: self.sluglify,
            limit: self.limit,
        })
    }
}

/// Turn a site argument into a base URL.
///
/// Full URLs pass through; family names and hosts map to the configured
/// URL; an empty value selects `default_site`.
pub fn resolve_site(config: &Config, value: &str, default_site: Site) -> Result<String> {
    if value.is_empty() {
        return Ok(config.site_url(default_site).to_string());
    }
    if value.starts_with("http://") || value.starts_with("https://") {
        validate_site_url(value)?;
        return Ok(value.trim_end_matches('/').to_string());
    }

    let site: Site = value.parse().map_err(|e: String| Error::ConfigValidation {
        field: "site".to_string(),
        message: e,
    })?;
    Ok(config.site_url(site).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("party-dl").chain(args.iter().copied()))
    }

    #[test]
    fn test_pull_defaults() {
        let args = parse(&["kemono", "patreon", "12345"]).unwrap();
        let Command::Kemono(pull) = args.command else {
            panic!("expected kemono subcommand");
        };
        let options = pull.run_options(&Config::default(), Site::Kemono).unwrap();
        assert_eq!(options.site, "https://kemono.su");
        assert_eq!(options.workers, 32);
        assert_eq!(options.size_limit, -1);
        assert_eq!(options.file_format, "{filename}");
        assert!(options.files);
        assert!(options.exclude_external);
    }

    #[test]
    fn test_pull_flags() {
        let args = parse(&[
            "coomer", "onlyfans", "someone", "-w", "4", "-e", "mp4", "-e", "zip",
            "--ordered-short", "--size-limit", "50", "--no-files", "--verbose",
        ])
        .unwrap();
        assert!(args.verbose);
        let Command::Coomer(pull) = args.command else {
            panic!("expected coomer subcommand");
        };
        let options = pull.run_options(&Config::default(), Site::Coomer).unwrap();
        assert_eq!(options.site, "https://coomer.su");
        assert_eq!(options.workers, 4);
        assert_eq!(options.exclude_extensions, vec!["mp4", "zip"]);
        assert_eq!(options.file_format, "{post_id}_{index:03}.{extension}");
        assert_eq!(options.size_limit, 50);
        assert!(!options.files);
    }

    #[test]
    fn test_format_presets_conflict() {
        assert!(parse(&["kemono", "patreon", "1", "--post-id", "--post-title"]).is_err());
        assert!(parse(&["kemono", "patreon", "1", "--ordered-short", "--file-format", "{name}"]).is_err());
    }

    #[test]
    fn test_resolve_site() {
        let config = Config::default();
        assert_eq!(resolve_site(&config, "", Site::Coomer).unwrap(), "https://coomer.su");
        assert_eq!(resolve_site(&config, "kemono", Site::Coomer).unwrap(), "https://kemono.su");
        assert_eq!(
            resolve_site(&config, "http://127.0.0.1:9000/", Site::Kemono).unwrap(),
            "http://127.0.0.1:9000"
        );
        assert!(resolve_site(&config, "example.org", Site::Kemono).is_err());
    }

    #[test]
    fn test_update_and_search() {
        let args = parse(&["update", "artist", "-w", "2", "--full-check"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Update { workers: Some(2), full_check: true, .. }
        ));

        let args = parse(&["search", "alice", "coomer", "--service", "onlyfans"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search subcommand");
        };
        assert!(!search.interactive);
        assert_eq!(search.service.as_deref(), Some("onlyfans"));
    }

    #[test]
    fn test_interactive_search_pulls_with_post_ids() {
        let args = parse(&["search", "alice", "kemono", "-i", "-l", "5", "-e", "psd"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search subcommand");
        };
        assert!(search.interactive);
        let options = search.run_options(&Config::default(), "https://kemono.su");
        assert_eq!(options.file_format, POST_ID_FORMAT);
        assert_eq!(options.limit, Some(5));
        assert_eq!(options.exclude_extensions, vec!["psd"]);
        assert_eq!(options.workers, 32);
        assert!(options.exclude_external);
    }

    #[test]
    fn test_post_tool_subcommands() {
        let args = parse(&["dump-posts", "patreon", "42", "--name", "artist", "--no-directory"]).unwrap();
        assert!(matches!(
            args.command,
            Command::DumpPosts { no_directory: true, limit: None, .. }
        ));

        let args = parse(&["embedded-links", "fanbox", "7", "-s", "coomer"]).unwrap();
        assert!(matches!(args.command, Command::EmbeddedLinks { ref site, .. } if site == "coomer"));

        let args = parse(&["custom-parse", "patreon", "42", r"https://\S+", "-l", "3"]).unwrap();
        assert!(matches!(args.command, Command::CustomParse { limit: Some(3), .. }));

        assert!(parse(&["dump-posts", "patreon", "42"]).is_err());
    }
}
