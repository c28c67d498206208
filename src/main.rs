//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror offline website mirror.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_mirror::config::{build_config, ConfigOverrides, Environment, MirrorConfig};
use sumi_mirror::crawler::mirror;
use sumi_mirror::output::{print_summary, MirrorSummary};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: an offline website mirror
///
/// Sumi-Mirror downloads a website starting from one root page, follows links that stay
/// under a required prefix, and rewrites pages and stylesheets so the saved copy can be
/// browsed from disk.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "An offline website mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE", env = "SUMI_MIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Page the mirror starts from
    #[arg(short, long, value_name = "URL", env = "SUMI_MIRROR_ROOT")]
    root: Option<String>,

    /// Directory the mirror is written to
    #[arg(short, long, value_name = "DIR", env = "SUMI_MIRROR_OUTPUT")]
    output: Option<PathBuf>,

    /// Maximum number of link hops from the root page
    #[arg(long, value_name = "N", env = "SUMI_MIRROR_MAX_DEPTH")]
    max_depth: Option<u32>,

    /// Prefix every followed page must start with (defaults to the root URL)
    #[arg(long, value_name = "URL", env = "SUMI_MIRROR_REQUIRED_PREFIX")]
    required_prefix: Option<String>,

    /// Number of concurrent downloads
    #[arg(long, value_name = "N", env = "SUMI_MIRROR_DOWNLOAD_CONCURRENCY")]
    download_concurrency: Option<usize>,

    /// Number of concurrent parsers
    #[arg(long, value_name = "N", env = "SUMI_MIRROR_PARSE_CONCURRENCY")]
    parse_concurrency: Option<usize>,

    /// Regular expression for pages that are never downloaded (repeatable)
    #[arg(long = "ignore", value_name = "REGEX")]
    ignore: Vec<String>,

    /// Runtime environment: development or production
    #[arg(long, value_name = "ENV", env = "SUMI_MIRROR_ENVIRONMENT")]
    environment: Option<Environment>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            root_url: self.root.clone(),
            output_dir: self.output.clone(),
            max_depth: self.max_depth,
            required_prefix: self.required_prefix.clone(),
            download_concurrency: self.download_concurrency,
            parse_concurrency: self.parse_concurrency,
            ignore_patterns: self.ignore.clone(),
            environment: self.environment,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration
    let (config, config_hash) = build_config(cli.config.as_deref(), cli.overrides())
        .context("Failed to load configuration")?;

    // Setup logging based on verbosity and environment
    setup_logging(cli.verbose, cli.quiet, config.environment);

    if let (Some(path), Some(hash)) = (&cli.config, &config_hash) {
        tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            hash
        );
    }

    let quiet = cli.quiet;
    let summary = handle_mirror(config).await?;
    if !quiet {
        print_summary(&summary);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// The development environment logs targets, files and line numbers; production logs
/// compact lines.
fn setup_logging(verbose: u8, quiet: bool, environment: Environment) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    match environment {
        Environment::Development => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .init(),
        Environment::Production => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .compact()
            .init(),
    }
}

/// Handles the main mirror operation
async fn handle_mirror(config: MirrorConfig) -> anyhow::Result<MirrorSummary> {
    tracing::info!(
        "Starting mirror of {} into {}",
        config.root_url,
        config.output_dir.display()
    );

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, stopping workers");
                interrupt.cancel();
            }
            Err(e) => tracing::warn!("Cannot listen for interrupts: {}", e),
        }
    });

    match mirror(config, Some(shutdown)).await {
        Ok(summary) => {
            tracing::info!("Mirror finished");
            Ok(summary)
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}
