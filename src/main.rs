//! # Vigil — scheduled status-page monitoring and notification
//!
//! Polls a status endpoint on per-destination schedules, parses it into a
//! structured report, and delivers at most one notification per
//! destination per period.
//!
//! Usage:
//!   vigil run                         # Start the scheduler engine
//!   vigil add grp1 --daily 08:00      # Daily notification at 08:00 UTC
//!   vigil add grp2 --every 3600       # Every hour
//!   vigil list                        # Show all destinations
//!   vigil status grp1                 # Schedule + last-notified state

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vigil_channels::NotifierSet;
use vigil_core::VigilConfig;
use vigil_report::HttpFetcher;
use vigil_scheduler::{Destination, EngineOptions, Scheduler, ScheduleStore};

#[derive(Parser)]
#[command(name = "vigil", version, about = "👁 Vigil — status-page monitor and notifier")]
struct Cli {
    /// Config file path (default: ~/.vigil/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scheduler engine (runs until Ctrl-C)
    Run,
    /// Add or update a destination
    Add {
        /// Destination id (chat id, group id, ...)
        id: String,
        /// Daily notification time, HH:MM (UTC)
        #[arg(long, conflicts_with = "every")]
        daily: Option<String>,
        /// Recurring interval in seconds
        #[arg(long)]
        every: Option<u64>,
    },
    /// Remove a destination
    Remove { id: String },
    /// Enable a destination
    Enable { id: String },
    /// Disable a destination
    Disable { id: String },
    /// List all destinations
    List,
    /// Show one destination's schedule and last-notified state
    Status { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "vigil=debug" } else { "vigil=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => {
            let path = shellexpand::tilde(path).to_string();
            VigilConfig::load_from(std::path::Path::new(&path))?
        }
        None => VigilConfig::load()?,
    };

    let store_path = config.scheduler.resolved_store_path();
    let mut store = ScheduleStore::open(&store_path)?;

    match cli.command {
        Commands::Run => run_engine(config, store).await,
        Commands::Add { id, daily, every } => {
            let dest = if let Some(hhmm) = daily {
                Destination::daily(&id, parse_daily(&hhmm)?)
            } else if let Some(secs) = every {
                Destination::every(&id, secs)
            } else {
                // Default mirrors the common case: daily at 08:00 UTC.
                Destination::daily(&id, NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default())
            };
            let summary = dest.schedule.to_string();
            store.upsert(dest)?;
            println!("✅ Destination '{id}' scheduled ({summary})");
            Ok(())
        }
        Commands::Remove { id } => {
            if store.remove(&id)? {
                println!("🗑️ Destination '{id}' removed");
            } else {
                println!("⚠️ No destination '{id}'");
            }
            Ok(())
        }
        Commands::Enable { id } => {
            if store.set_enabled(&id, true)? {
                println!("✅ Destination '{id}' enabled");
            } else {
                println!("⚠️ No destination '{id}'");
            }
            Ok(())
        }
        Commands::Disable { id } => {
            if store.set_enabled(&id, false)? {
                println!("🚫 Destination '{id}' disabled");
            } else {
                println!("⚠️ No destination '{id}'");
            }
            Ok(())
        }
        Commands::List => {
            let destinations = store.list();
            if destinations.is_empty() {
                println!("No destinations configured.");
            }
            for d in destinations {
                let state = if d.enabled { "enabled" } else { "disabled" };
                println!("{} [{}] {}", d.id, state, d.schedule);
            }
            for id in store.quarantined_ids() {
                println!("{id} [corrupt record — disabled]");
            }
            Ok(())
        }
        Commands::Status { id } => {
            match store.get(&id) {
                Some(d) => {
                    println!("Destination:   {}", d.id);
                    println!("State:         {}", if d.enabled { "enabled" } else { "disabled" });
                    println!("Schedule:      {}", d.schedule);
                    println!(
                        "Last notified: {}",
                        d.last_notified
                            .map(|t| t.to_rfc3339())
                            .unwrap_or_else(|| "never".to_string())
                    );
                }
                None => println!("⚠️ No destination '{id}'"),
            }
            Ok(())
        }
    }
}

/// Validate and parse an HH:MM time of day.
fn parse_daily(hhmm: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(hhmm, "%H:%M")
        .map_err(|_| anyhow::anyhow!("invalid time '{hhmm}' (expected HH:MM)"))
}

async fn run_engine(config: VigilConfig, store: ScheduleStore) -> Result<()> {
    let fetcher = Arc::new(HttpFetcher::new(
        &config.source.url,
        std::time::Duration::from_secs(config.source.fetch_timeout_secs),
    ));
    let notifiers = NotifierSet::from_config(&config.notify);
    if notifiers.is_empty() {
        tracing::warn!("⚠️ No notification transport configured; deliveries will fail and retry");
    } else {
        tracing::info!("🔔 Transports: {}", notifiers.transport_names().join(", "));
    }

    let (scheduler, _handle) = Scheduler::new(
        store,
        fetcher,
        Arc::new(notifiers),
        EngineOptions::from(&config.scheduler),
    );

    println!("👁 Vigil v{}", env!("CARGO_PKG_VERSION"));
    println!("   📡 Source: {}", config.source.url);
    println!();

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Ctrl-C received — shutting down");
            shutdown.cancel();
        }
    });

    scheduler.run(cancel).await;
    Ok(())
}
