use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use review_scrape::config::{RunConfig, load_config, validate_config};
use review_scrape::runner::Runner;
use review_scrape::{Site, Target};

#[derive(Parser, Debug)]
#[command(name = "review-scrape", version, about = "Collect user reviews from paginated review pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect reviews for every configured target
    Run {
        /// Path to the TOML run configuration
        #[arg(short, long, default_value = "reviews.toml")]
        config: PathBuf,
        /// Only run targets for this site (imdb, rt, watcha)
        #[arg(short, long)]
        site: Option<Site>,
        /// Override collector.max_items
        #[arg(long)]
        max_items: Option<usize>,
        /// Override collector.max_rounds
        #[arg(long)]
        max_rounds: Option<usize>,
        /// Override output.path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print configured targets with their resolved listing URLs
    Targets {
        #[arg(short, long, default_value = "reviews.toml")]
        config: PathBuf,
    },

    /// Validate the configuration and every target locator
    Check {
        #[arg(short, long, default_value = "reviews.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Run {
            config,
            site,
            max_items,
            max_rounds,
            output,
        } => {
            let mut config = load(&config)?;
            if let Some(max_items) = max_items {
                config.collector.max_items = max_items;
            }
            if let Some(max_rounds) = max_rounds {
                config.collector.max_rounds = max_rounds;
            }
            if let Some(output) = output {
                config.output.path = output;
            }
            validate_config(&config).context("Configuration validation failed")?;

            let targets: Vec<Target> = config
                .targets
                .iter()
                .filter(|t| site.is_none_or(|s| t.site == s))
                .cloned()
                .collect();
            if targets.is_empty() {
                warn!("No targets match the site filter");
                return Ok(());
            }

            info!(
                "Collecting {} targets (max {} reviews, {} rounds each) -> {:?}",
                targets.len(),
                config.collector.max_items,
                config.collector.max_rounds,
                config.output.path
            );
            let mut runner = Runner::from_config(&config).context("Failed to set up runner")?;
            let summary = runner.run(&targets).await?;
            if summary.aborted {
                anyhow::bail!("run aborted after the session was lost");
            }
        }

        Command::Targets { config } => {
            let config = load(&config)?;
            for target in &config.targets {
                let url = target
                    .site
                    .adapter()
                    .and_then(|adapter| adapter.locator(target))
                    .map(|url| url.to_string())
                    .unwrap_or_else(|e| format!("<{}>", e));
                println!(
                    "{}\t{}\t{}\t{}",
                    target.site.label(),
                    target.title,
                    target.title_en.as_deref().unwrap_or("-"),
                    url
                );
            }
        }

        Command::Check { config } => {
            let config = load(&config)?;
            validate_config(&config).context("Configuration validation failed")?;
            for target in &config.targets {
                let adapter = target.site.adapter()?;
                adapter
                    .locator(target)
                    .with_context(|| format!("Bad locator for {}", target.display_title()))?;
            }
            info!("Configuration OK: {} targets", config.targets.len());
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<RunConfig> {
    info!("Loading configuration from {:?}", path);
    load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
}
