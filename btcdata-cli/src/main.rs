//! btcdata CLI: keep the daily Bitcoin feature dataset current.
//!
//! Commands:
//! - `sync`: fetch everything after the last stored date and append it
//! - `last-updated`: print when the dataset was last synchronized
//! - `status`: row count, date range, fingerprint, freshness
//! - `show`: print the most recent rows as CSV or JSON
//! - `watch`: serve the dataset through a TTL cache, syncing on expiry
//! - `init-config`: write the default feed configuration as TOML

use anyhow::{bail, Context, Result};
use btcdata_core::sync::{SyncStatus, SyncState};
use btcdata_core::{DatasetCache, SyncConfig, SyncOutcome, Synchronizer};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "btcdata",
    about = "btcdata: incremental Bitcoin feature dataset synchronizer"
)]
struct Cli {
    /// Feed configuration (TOML). Defaults to the built-in feed set.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the dataset and timestamp files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch data after the last stored date and append it.
    Sync,
    /// Print the last successful sync time.
    LastUpdated,
    /// Report size, date range, fingerprint, and freshness.
    Status,
    /// Print the most recent rows.
    Show {
        /// Number of rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,

        /// Print JSON objects instead of CSV.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Re-check the dataset periodically, syncing when the cache expires.
    Watch {
        /// Seconds between checks.
        #[arg(long, default_value_t = 300)]
        interval: u64,

        /// Stop after this many checks (runs until killed if omitted).
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Write the default configuration to a file.
    InitConfig {
        /// Destination path.
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::InitConfig { path, force } = &cli.command {
        return run_init_config(path, *force);
    }

    let config = load_config(cli.config.as_deref(), cli.data_dir)?;

    match cli.command {
        Commands::Sync => run_sync(config),
        Commands::LastUpdated => run_last_updated(config),
        Commands::Status => run_status(config),
        Commands::Show { rows, json } => run_show(config, rows, json),
        Commands::Watch {
            interval,
            iterations,
        } => run_watch(config, interval, iterations),
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }
    Ok(config)
}

fn run_sync(config: SyncConfig) -> Result<()> {
    let sync = Synchronizer::from_config(config).context("building data sources")?;
    let outcome = sync
        .synchronize()
        .with_context(|| format!("synchronizing {}", sync.dataset_path().display()))?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome.status {
        SyncStatus::Updated { rows_added } => {
            println!("Added {rows_added} row(s); dataset now has {} rows", outcome.dataset.len());
        }
        SyncStatus::NoUpdate(reason) => println!("No update: {reason}"),
    }
    if let Some(last) = outcome.dataset.last_date() {
        println!("Last date: {last}");
    }
    for issue in &outcome.issues {
        println!("  - {issue}");
    }
}

fn run_last_updated(config: SyncConfig) -> Result<()> {
    let sync = Synchronizer::from_config(config)?;
    println!("{}", sync.last_update_time());
    Ok(())
}

fn run_status(config: SyncConfig) -> Result<()> {
    let sync = Synchronizer::from_config(config)?;
    let path = sync.dataset_path();
    let dataset = sync.load().with_context(|| format!("reading {}", path.display()))?;

    println!("Dataset:      {}", path.display());
    println!("Rows:         {}", dataset.len());
    println!("Columns:      {}", dataset.columns().len());
    match (dataset.first_date(), dataset.last_date()) {
        (Some(first), Some(last)) => println!("Date range:   {first} .. {last}"),
        _ => println!("Date range:   (empty)"),
    }
    println!("Fingerprint:  {}", dataset.fingerprint());
    match sync.state()? {
        SyncState::UpToDate => println!("State:        up to date"),
        SyncState::Stale { gap } => {
            println!("State:        stale, {} day(s) missing ({gap})", gap.days())
        }
    }
    println!("Last updated: {}", sync.last_update_time());
    Ok(())
}

fn run_show(config: SyncConfig, rows: usize, json: bool) -> Result<()> {
    let sync = Synchronizer::from_config(config)?;
    let dataset = sync
        .load()
        .with_context(|| format!("reading {}", sync.dataset_path().display()))?;
    let tail = dataset.tail(rows);

    if json {
        let objects = dataset.rows_as_json(tail);
        println!("{}", serde_json::to_string_pretty(&objects)?);
    } else {
        let stdout = std::io::stdout();
        dataset.rows_to_writer(stdout.lock(), tail)?;
    }
    Ok(())
}

fn run_watch(config: SyncConfig, interval: u64, iterations: Option<u64>) -> Result<()> {
    if interval == 0 {
        bail!("--interval must be at least 1 second");
    }
    let mut cache = DatasetCache::new(config.cache.ttl());
    let sync = Synchronizer::from_config(config)?;
    info!(ttl_secs = cache.ttl().as_secs(), interval, "watching dataset");

    let mut checks = 0u64;
    loop {
        let fresh = cache.is_fresh();
        match cache.get_or_refresh(|| sync.synchronize().map(|outcome| {
            for issue in &outcome.issues {
                warn!(%issue, "sync issue");
            }
            outcome.dataset
        })) {
            Ok(dataset) => {
                let last = dataset
                    .last_date()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{} rows, last date {last}{}",
                    dataset.len(),
                    if fresh { " (cached)" } else { "" }
                );
            }
            Err(e) => warn!(error = %e, "sync failed, keeping previous snapshot"),
        }

        checks += 1;
        if iterations.is_some_and(|n| checks >= n) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_secs(interval));
    }
}

fn run_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let toml = SyncConfig::default().to_toml()?;
    std::fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
