//! Shelfwatch main entry point
//!
//! This is the command-line interface for the Shelfwatch price re-checker.

use clap::Parser;
use shelfwatch::config::{load_config_with_hash, Config, SiteConfig};
use shelfwatch::dataset::{select_work_items, DatasetStore, SqliteDataset};
use shelfwatch::driver::GenericDriver;
use shelfwatch::egress::HttpListingSource;
use shelfwatch::session::{FetchSession, HttpFetcher, SessionReport, SessionSettings};
use shelfwatch::summary::{load_summaries, print_summaries, write_summary, RunSummary};
use shelfwatch::supervisor::{ProcessLauncher, Supervisor};
use shelfwatch::{Reconciler, ShelfError};
use std::path::{Path, PathBuf};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

/// Shelfwatch: resilient price and stock re-checking
///
/// Shelfwatch re-checks price and stock status for the product links of every
/// enabled site, one worker process per site, routing requests through a
/// rotating pool of egress points and merging results into a shared dataset.
#[derive(Parser, Debug)]
#[command(name = "shelfwatch")]
#[command(version = "1.0.0")]
#[command(about = "Resilient price and stock re-checker", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run a single site's session in this process
    #[arg(long, value_name = "NAME", conflicts_with_all = ["dry_run", "stats"])]
    site: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be checked without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the stored run summaries and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(name) = cli.site.as_deref() {
        let site = config
            .site(name)
            .ok_or_else(|| ShelfError::UnknownSite(name.to_string()))?;
        let span = tracing::info_span!("worker", site = %site.name);
        handle_site(&config, site, &config_hash).instrument(span).await?;
    } else {
        handle_supervise(&config, &cli).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelfwatch=info,warn"),
            1 => EnvFilter::new("shelfwatch=debug,info"),
            2 => EnvFilter::new("shelfwatch=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be checked
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Shelfwatch Dry Run ===\n");

    println!("Egress:");
    println!(
        "  Preferred: {} ({:?})",
        config.egress.preferred_address, config.egress.preferred_scheme
    );
    println!("  Listing: {}", config.egress.listing_url);
    println!(
        "  Pool: up to {} candidates, {} minimum, {} refreshes",
        config.egress.max_candidates, config.egress.min_viable, config.egress.max_global_refreshes
    );

    println!("\nDataset:");
    println!("  Path: {}", config.dataset.path);
    println!(
        "  Save attempts: {} (base delay {}ms)",
        config.dataset.save_attempts, config.dataset.save_base_delay
    );

    // Only peek at an existing dataset; never create one in a dry run
    let path = Path::new(&config.dataset.path);
    let rows = if path.exists() {
        Some(SqliteDataset::open(path)?.load_rows()?)
    } else {
        println!("  (file does not exist yet)");
        None
    };
    let today = chrono::Local::now().date_naive();

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        let state = if site.enabled { "enabled" } else { "disabled" };
        let route = if site.use_egress_pool { "pool" } else { "direct" };
        match &rows {
            Some(rows) => println!(
                "  - {} ({}, {}, {} items due)",
                site.name,
                state,
                route,
                select_work_items(rows, &site.name, today).len()
            ),
            None => println!("  - {} ({}, {})", site.name, state, route),
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start {} site workers, {} at a time",
        config.enabled_sites().count(),
        config.supervisor.max_concurrent_sites
    );

    Ok(())
}

/// Handles the --stats mode: shows stored run summaries
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Stats directory: {}\n", config.supervisor.stats_dir);

    let summaries = load_summaries(Path::new(&config.supervisor.stats_dir))?;
    print_summaries(&summaries);

    Ok(())
}

/// Handles --site: one session, then reconcile and write the run summary
async fn handle_site(
    config: &Config,
    site: &SiteConfig,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let today = chrono::Local::now().date_naive();
    let dataset = SqliteDataset::open(&config.dataset.path)?;

    let items = select_work_items(&dataset.load_rows()?, &site.name, today);
    if items.is_empty() {
        // A run with nothing due still replaces the previous summary
        let summary = RunSummary::from_report(&SessionReport::empty(&site.name), 0, config_hash);
        let path = write_summary(Path::new(&config.supervisor.stats_dir), &summary)?;
        tracing::info!(summary = %path.display(), "Nothing to check today");
        return Ok(());
    }

    let listing = HttpListingSource::new(config.egress.listing_url.clone(), &config.fetch)?;
    let fetcher = HttpFetcher::new(config.fetch.clone());
    let driver = GenericDriver::from_site(site)?;
    let settings = SessionSettings::for_site(config, site);

    let mut session = FetchSession::new(settings, fetcher, listing, driver);
    let report = session.run(&items).await;

    if !report.is_complete() {
        tracing::warn!(
            outcome = ?report.outcome,
            skipped = report.skipped,
            "Run was incomplete"
        );
    }

    let mut reconciler = Reconciler::new(dataset, &config.dataset);
    let updated = reconciler.reconcile(&site.name, &report.results, today).await;

    let summary = RunSummary::from_report(&report, updated, config_hash);
    let path = write_summary(Path::new(&config.supervisor.stats_dir), &summary)?;
    tracing::info!(
        processed = summary.items_processed,
        updated,
        duration = %summary.duration_formatted,
        summary = %path.display(),
        "Site finished"
    );

    Ok(())
}

/// Handles the default mode: one worker process per enabled site
async fn handle_supervise(config: &Config, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let sites: Vec<String> = config.enabled_sites().map(|s| s.name.clone()).collect();
    if sites.is_empty() {
        tracing::warn!("No enabled sites in configuration");
        return Ok(());
    }

    let mut args = Vec::new();
    if cli.quiet {
        args.push("--quiet".to_string());
    } else if cli.verbose > 0 {
        args.push(format!("-{}", "v".repeat(cli.verbose as usize)));
    }

    let launcher = ProcessLauncher::current_exe(&cli.config)?.with_args(args);
    let supervisor = Supervisor::new(launcher, &config.supervisor);
    let report = supervisor.run(sites).await;

    if !report.all_succeeded() {
        let failed: Vec<&str> = report.failed().map(|s| s.site.as_str()).collect();
        tracing::warn!("Some site workers failed: {}", failed.join(", "));
    }

    Ok(())
}
