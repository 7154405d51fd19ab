/// Main entry point for plexcord
use anyhow::Context;
use clap::Parser;
use plexcord::config::{token_cache_path, Config};
use plexcord::{App, DiscordPresence, PlexAccount, PlexMonitor, TmdbClient};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Discord allows one presence update per 15 seconds
const DEFAULT_INTERVAL_SECS: u64 = 15;

#[derive(Parser, Debug)]
#[command(
    name = "plexcord",
    version,
    about = "Mirror your Plex playback session into Discord Rich Presence",
    long_about = None
)]
struct Args {
    /// Configuration file (defaults to config.json in the platform config
    /// directory, then the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error), overriding the
    /// configured severity
    #[arg(short, long)]
    log_level: Option<String>,

    /// Poll interval in seconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, config_dir) =
        Config::load(args.config.as_deref()).context("failed to load configuration")?;

    let severity = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.severity);
    init_logging(severity)?;

    info!("Starting plexcord v{}", env!("CARGO_PKG_VERSION"));

    let token_path = token_cache_path(&config_dir);
    config
        .validate(token_path.exists())
        .context("invalid configuration")?;
    info!("Configuration loaded");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;

    // Startup failures here are fatal; anything after this retries forever
    let account = PlexAccount::login(http.clone(), &config.plex, &token_path)
        .await
        .context("Plex authentication failed")?;
    let monitor = PlexMonitor::connect(account, config.plex.clone())
        .await
        .context("failed to locate the configured Plex Media Server")?;

    let metadata = config
        .tmdb
        .enable
        .then(|| TmdbClient::new(http, config.tmdb.api_key.clone()));
    if metadata.is_none() {
        info!("TMDB enrichment disabled, some presence fields will be unavailable");
    }

    let sink = DiscordPresence::new(&config.discord.app_id);
    let mut app = App::new(monitor, metadata, sink, config.discord.minimal);

    let interval = Duration::from_secs(args.interval.max(1));
    tokio::select! {
        _ = app.run(interval) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }
    app.shutdown();

    Ok(())
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let level_filter: tracing_subscriber::filter::LevelFilter = level
        .parse()
        .with_context(|| format!("invalid log level: {}", level))?;
    tracing_subscriber::fmt()
        .with_max_level(level_filter)
        .init();
    Ok(())
}
