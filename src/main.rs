//! cve-notifier: binary entrypoint.
//! Loads config, wires the feed source and webhook dispatcher, runs one pass and
//! maps the outcome to the process exit code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cve_notifier::config::{load_config_default, load_config_from};
use cve_notifier::ingest::providers::syndication::SyndicationProvider;
use cve_notifier::{run_once, Dispatcher, RunError, RunPlan, RunSummary};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Match a vulnerability feed against keywords and post new hits to webhooks.
#[derive(Parser, Debug)]
#[command(name = "cve-notifier", version, about, long_about = None)]
struct Cli {
    /// Config file (TOML, JSON or YAML). Falls back to $CVE_NOTIFIER_CONFIG, then
    /// ./config.toml, ./config.json, ./config.yaml, ./config.yml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the feed URL from the config.
    #[arg(long)]
    feed_url: Option<String>,

    /// Read the feed from a local file instead of fetching it.
    #[arg(long, conflicts_with = "feed_url")]
    feed_file: Option<PathBuf>,

    /// Override the seen-store path from the config.
    #[arg(long)]
    seen_store: Option<PathBuf>,

    /// Log rendered notifications; send nothing and mark nothing seen.
    #[arg(long)]
    dry_run: bool,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cve_notifier=info,warn"));

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
    }
}

async fn run(cli: Cli) -> Result<RunSummary, RunError> {
    let mut cfg = match &cli.config {
        Some(p) => load_config_from(p),
        None => load_config_default(),
    }
    .map_err(RunError::Config)?;

    if let Some(url) = cli.feed_url {
        cfg.feed_url = url;
    }
    if let Some(p) = cli.seen_store {
        cfg.seen_store = p;
    }
    tracing::info!(
        keywords = cfg.keywords.len(),
        endpoints = cfg.http_push.len(),
        seen_store = %cfg.seen_store.display(),
        "config loaded"
    );
    if cfg.http_push.is_empty() {
        tracing::warn!("no httpPush endpoints configured; matches will only be logged");
    }

    let source = match &cli.feed_file {
        Some(p) => SyndicationProvider::from_file(p).map_err(RunError::Fetch)?,
        None => SyndicationProvider::from_url(&cfg.feed_url, cfg.request_timeout(), &cfg.user_agent)
            .map_err(RunError::Config)?,
    };
    let dispatcher =
        Dispatcher::new(cfg.request_timeout(), &cfg.user_agent).map_err(RunError::Config)?;
    let plan = RunPlan::from_config(&cfg).with_dry_run(cli.dry_run);

    run_once(&plan, &source, &dispatcher).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(state = %e.failed_in(), "{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
