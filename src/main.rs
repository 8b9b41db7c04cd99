//! Party Downloader - CLI entry point.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use party_downloader::{
    api::{search_creators, Creator, PartyApi},
    cli::{resolve_site, Args, Command, PullArgs, SearchArgs},
    config::{unhosted_service, validate_service, Config, PullInfo, RunOptions, Site},
    download::{dump_path, dump_posts, pull_creator},
    error::{exit_codes, Error, Result},
    media::{collect_embeds, count_files, find_in_content},
    output::{
        create_spinner, print_banner, print_creators, print_details, print_error, print_info,
        print_pull_stats, print_pull_summary, print_success, print_warning, prompt_selection,
    },
};

/// Debug log written to the working directory when not running verbose.
const DEBUG_LOG_FILE: &str = ".party-debug.log";

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            tracing::debug!("Exiting with error: {:?}", e);
            match e {
                Error::Config(_)
                | Error::ConfigValidation { .. }
                | Error::MissingConfig(_)
                | Error::TomlParse(_)
                | Error::Template(_) => ExitCode::from(exit_codes::CONFIG_ERROR as u8),
                Error::Api(_) | Error::CreatorNotFound { .. } | Error::Http(_) => {
                    ExitCode::from(exit_codes::API_ERROR as u8)
                }
                Error::Download(_) | Error::CorruptCache { .. } => {
                    ExitCode::from(exit_codes::DOWNLOAD_ERROR as u8)
                }
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

/// Console logging, plus a DEBUG log file unless running verbose.
fn setup_logging(verbose: bool) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    if verbose {
        tracing_subscriber::registry().with(console_layer).init();
        return;
    }

    let file_appender = tracing_appender::rolling::never(".", DEBUG_LOG_FILE);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_appender)
        .with_filter(EnvFilter::new("info,party_downloader=debug,party_dl=debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

async fn run(args: Args) -> Result<()> {
    print_banner();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;

    match args.command {
        Command::Kemono(pull) => cmd_pull(&config, &pull, Site::Kemono).await,
        Command::Coomer(pull) => cmd_pull(&config, &pull, Site::Coomer).await,
        Command::Update {
            folder,
            limit,
            workers,
            full_check,
        } => cmd_update(&config, &folder, limit, workers, full_check).await,
        Command::Search(search) => cmd_search(&config, &search).await,
        Command::Details {
            service,
            user,
            site,
            exclude_extensions,
        } => cmd_details(&config, &service, &user, &site, &exclude_extensions).await,
        Command::EmbeddedLinks {
            service,
            user,
            site,
        } => cmd_embedded_links(&config, &service, &user, &site).await,
        Command::DumpPosts {
            service,
            user,
            name,
            site,
            limit,
            no_directory,
        } => {
            let creator = Creator::new(user, name, service);
            cmd_dump_posts(&config, &creator, &site, limit, !no_directory).await
        }
        Command::CustomParse {
            service,
            user,
            pattern,
            site,
            limit,
        } => cmd_custom_parse(&config, &service, &user, &pattern, &site, limit).await,
    }
}

/// `kemono` / `coomer`: look the creator up and pull it.
async fn cmd_pull(config: &Config, pull: &PullArgs, default_site: Site) -> Result<()> {
    validate_service(&pull.service)?;
    let options = pull.run_options(config, default_site)?;
    if let Some(family) = unhosted_service(&options.site, &pull.service) {
        print_warning(&format!(
            "{} is not a {} service; the creator lookup will likely fail",
            pull.service, family
        ));
    }
    let api = PartyApi::new(&options.site, &config.client_settings())?;

    let creator = match &pull.name {
        Some(name) => Creator::new(pull.user.as_str(), name.as_str(), pull.service.as_str()),
        None => lookup_creator(&api, &pull.service, &pull.user).await?,
    };

    run_pull(&api, &creator, &options).await
}

/// `update`: re-run the pull recorded in `folder`.
async fn cmd_update(
    config: &Config,
    folder: &Path,
    limit: Option<usize>,
    workers: Option<usize>,
    full_check: bool,
) -> Result<()> {
    let info = PullInfo::load(folder)?;
    print_info(&format!(
        "Updating {} ({}) in {}",
        info.user.name,
        info.user.service,
        folder.display()
    ));

    let options = RunOptions {
        directory: Some(folder.to_path_buf()),
        workers: workers.unwrap_or(config.options.update_workers),
        limit,
        full_check,
        ..info.options
    };
    let api = PartyApi::new(&options.site, &config.client_settings())?;

    run_pull(&api, &info.user, &options).await
}

/// `search`: list creators whose name contains the query, then optionally
/// pull one of them.
async fn cmd_search(config: &Config, search: &SearchArgs) -> Result<()> {
    let site = resolve_site(config, &search.site, Site::Kemono)?;
    let api = PartyApi::new(&site, &config.client_settings())?;

    let spinner = create_spinner("Pulling creator index...");
    let creators = api.get_creators().await;
    spinner.finish_and_clear();

    let matches = search_creators(creators?, &search.query, search.service.as_deref());
    tracing::debug!("{} creators match '{}'", matches.len(), search.query);
    print_creators(&matches);

    if !search.interactive || matches.is_empty() {
        return Ok(());
    }

    let selected = &matches[prompt_selection(matches.len())?];
    print_success(&format!(
        "Downloading {} using specified options...",
        selected.name
    ));
    run_pull(&api, selected, &search.run_options(config, &site)).await
}

/// `details`: post, attachment and file counts for a creator.
async fn cmd_details(
    config: &Config,
    service: &str,
    user: &str,
    site: &str,
    exclude_extensions: &[String],
) -> Result<()> {
    validate_service(service)?;
    let site = resolve_site(config, site, Site::Kemono)?;
    let api = PartyApi::new(&site, &config.client_settings())?;
    let creator = lookup_creator(&api, service, user).await?;

    let spinner = create_spinner(&format!("Creator found: {}; parsing posts...", creator.name));
    let posts = api.list_posts(&creator, None).await;
    spinner.finish_and_clear();
    let posts = posts?;

    let (attachments, files) = count_files(&posts, exclude_extensions);
    tracing::info!(
        "posts={} attachments={} files={}",
        posts.len(),
        attachments,
        files
    );
    print_details(&creator.name, posts.len(), attachments, files);
    Ok(())
}

/// `embedded-links`: print a creator's non-empty embeds as JSON.
async fn cmd_embedded_links(config: &Config, service: &str, user: &str, site: &str) -> Result<()> {
    validate_service(service)?;
    let site = resolve_site(config, site, Site::Kemono)?;
    let api = PartyApi::new(&site, &config.client_settings())?;
    let creator = lookup_creator(&api, service, user).await?;

    let spinner = create_spinner(&format!("Creator found: {}; parsing posts...", creator.name));
    let posts = api.list_posts(&creator, None).await;
    spinner.finish_and_clear();

    let embeds = collect_embeds(&posts?);
    tracing::info!("{} embeds found", embeds.len());
    println!("{}", serde_json::to_string(&embeds)?);
    Ok(())
}

/// `dump-posts`: write the posts JSON without downloading.
async fn cmd_dump_posts(
    config: &Config,
    creator: &Creator,
    site: &str,
    limit: Option<usize>,
    in_directory: bool,
) -> Result<()> {
    validate_service(&creator.service)?;
    let site = resolve_site(config, site, Site::Kemono)?;
    let api = PartyApi::new(&site, &config.client_settings())?;
    let output = dump_path(Path::new("."), &creator.name, in_directory);

    let spinner = create_spinner(&format!("Dumping posts for {}...", creator.name));
    let written = dump_posts(&api, creator, limit, &output).await;
    spinner.finish_and_clear();

    print_success(&format!("Wrote {} posts to {}", written?, output.display()));
    Ok(())
}

/// `custom-parse`: print every regex match over post contents as JSON.
async fn cmd_custom_parse(
    config: &Config,
    service: &str,
    user: &str,
    pattern: &str,
    site: &str,
    limit: Option<usize>,
) -> Result<()> {
    validate_service(service)?;
    let pattern = regex::Regex::new(pattern).map_err(|e| Error::ConfigValidation {
        field: "pattern".to_string(),
        message: e.to_string(),
    })?;
    let site = resolve_site(config, site, Site::Kemono)?;
    let api = PartyApi::new(&site, &config.client_settings())?;
    let creator = lookup_creator(&api, service, user).await?;

    let spinner = create_spinner(&format!("Creator found: {}; parsing posts...", creator.name));
    let posts = api.list_posts(&creator, limit).await;
    spinner.finish_and_clear();

    let found = find_in_content(&posts?, &pattern);
    tracing::info!("{} matches", found.len());
    println!("{}", serde_json::to_string(&found)?);
    Ok(())
}

async fn lookup_creator(api: &PartyApi, service: &str, user: &str) -> Result<Creator> {
    let spinner = create_spinner("Pulling creator index...");
    let creator = api.find_creator(service, user).await;
    spinner.finish_and_clear();
    creator
}

async fn run_pull(api: &PartyApi, creator: &Creator, options: &RunOptions) -> Result<()> {
    print_pull_summary(
        creator,
        &options.site,
        &options.directory_for(creator).display().to_string(),
        options.workers,
    );

    let summary = pull_creator(api, api, creator, options, true).await?;
    print_pull_stats(&summary);
    Ok(())
}
