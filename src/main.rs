//! News-Ripple main entry point
//!
//! This is the command-line interface for the News-Ripple index crawler.

use anyhow::Context;
use clap::Parser;
use news_ripple::config::{load_config, Config};
use news_ripple::crawler::{CrawlOrchestrator, HarvestOutcome, Harvester};
use news_ripple::source::{HttpSource, Source};
use news_ripple::storage::SqliteRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// News-Ripple: a periodic news index crawler
///
/// News-Ripple polls the index pages of configured news sources on a
/// randomized schedule, queues articles it has not seen before, and stores
/// them once retrieved.
#[derive(Parser, Debug)]
#[command(name = "news-ripple")]
#[command(version)]
#[command(about = "A periodic news index crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["once", "stats"])]
    dry_run: bool,

    /// Run a single discovery cycle, retrieve what it found, and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    once: bool,

    /// Show stored article counts and exit
    #[arg(long, conflicts_with_all = ["dry_run", "once"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let repository = Arc::new(
        SqliteRepository::open(Path::new(&config.storage.database_path))
            .with_context(|| format!("failed to open {}", config.storage.database_path))?,
    );

    if cli.stats {
        return handle_stats(&config, &repository);
    }

    let sources = config
        .sources
        .iter()
        .map(|entry| HttpSource::from_config(entry).map(|s| Arc::new(s) as Arc<dyn Source>))
        .collect::<Result<Vec<_>, _>>()?;

    let orchestrator = CrawlOrchestrator::from_config(&config, sources, repository.clone())?;
    let harvester = orchestrator.harvester(repository.clone());

    if cli.once {
        handle_once(&orchestrator, &harvester, &repository).await
    } else {
        handle_crawl(orchestrator, harvester).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_ripple=info,warn"),
            1 => EnvFilter::new("news_ripple=debug,info"),
            2 => EnvFilter::new("news_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== News-Ripple Dry Run ===\n");

    let interval = config.crawler.interval();
    println!("Crawler Configuration:");
    println!("  Max concurrent jobs: {}", config.crawler.max_thread_count);
    println!("  Cycle interval: {}s - {}s", interval.min, interval.max);

    let proxies = config.proxy.effective_endpoints();
    println!("\nProxies ({}):", proxies.len());
    for proxy in proxies {
        println!("  - {}", proxy);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSources ({}):", config.sources.len());
    for source in &config.sources {
        println!("  - {} ({})", source.id, source.index_url);
        println!("    items: {}", source.item_selector);
        if let Some(time) = &source.time_selector {
            println!(
                "    time: {} [{}]",
                time,
                source.time_attribute.as_deref().unwrap_or("datetime")
            );
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows stored article counts
fn handle_stats(config: &Config, repository: &SqliteRepository) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let total = repository.count_articles()?;
    println!("Stored articles: {}", total);
    for (source, count) in repository.count_by_source()? {
        println!("  {}: {}", source, count);
    }

    Ok(())
}

/// Handles the --once mode: one dispatch, full drain, full retrieval
async fn handle_once(
    orchestrator: &CrawlOrchestrator,
    harvester: &Harvester,
    repository: &SqliteRepository,
) -> anyhow::Result<()> {
    let pool = orchestrator.pool();
    pool.start()?;

    let submitted = orchestrator.dispatch().await?;
    tracing::info!(jobs = submitted, "Waiting for discovery jobs");
    pool.wait().await;

    for error in pool.take_errors() {
        tracing::warn!(error = %error, "Discovery job failed");
    }

    let queue = orchestrator.queue();
    println!("Discovered {} new articles", queue.len());

    let mut stored = 0;
    loop {
        match harvester.harvest_next().await {
            Ok(HarvestOutcome::Stored(_)) => stored += 1,
            Ok(HarvestOutcome::Idle) => break,
            Err(e) => tracing::warn!(error = %e, "Failed to harvest article"),
        }
    }

    println!("Stored {} articles ({} total)", stored, repository.count_articles()?);
    Ok(())
}

/// Handles the main crawl operation: runs until Ctrl-C
async fn handle_crawl(orchestrator: CrawlOrchestrator, harvester: Harvester) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    orchestrator.pool().bind(shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Interrupt received, shutting down"),
                Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt"),
            }
            shutdown.cancel();
        });
    }

    let harvesting = tokio::spawn(harvester.run(orchestrator.pool().cancellation_signal()));

    let result = orchestrator.run().await;
    if let Err(e) = harvesting.await {
        tracing::error!(error = %e, "Harvester task failed");
    }

    match result {
        Ok(()) => {
            tracing::info!("Crawler stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
