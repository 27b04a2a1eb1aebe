//! SNOWLANDER Player - main entry point
//!
//! Opens the database, restores the status slot, starts the playback engine
//! with the external decoder backend and serves the event stream.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use snowlander_common::config::{resolve_data_folder, PlayerConfig};
use snowlander_common::db::init_database;
use snowlander_player::api::{self, AppContext};
use snowlander_player::playback::{DecoderBackend, EngineSettings, PlaybackEngine};
use snowlander_player::sse::EventFanout;
use snowlander_player::status::StatusAggregator;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for snowlander-player
#[derive(Parser, Debug)]
#[command(name = "snowlander-player")]
#[command(about = "Playback coordinator for the SNOWLANDER music bot")]
#[command(version)]
struct Args {
    /// Port for the HTTP/SSE endpoint (overrides the config file)
    #[arg(short, long, env = "SNOWLANDER_PORT")]
    port: Option<u16>,

    /// Data folder holding the database
    #[arg(short, long, env = "SNOWLANDER_DATA_FOLDER")]
    data_folder: Option<PathBuf>,

    /// Path to config.toml
    #[arg(short, long, env = "SNOWLANDER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snowlander_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = PlayerConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let data_folder = resolve_data_folder(args.data_folder.as_deref(), &config);
    let db_path = config.database_path(&data_folder);
    let port = args.port.unwrap_or(config.port);

    info!("Starting SNOWLANDER Player on port {}", port);
    info!("Data folder: {}", data_folder.display());

    let db = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let fanout = EventFanout::new(config.event_buffer);
    let status = StatusAggregator::load(
        db.clone(),
        fanout,
        config.default_volume,
        Duration::from_millis(config.persist_timeout_ms),
    )
    .await
    .context("Failed to restore playback status")?;

    let backend = DecoderBackend::new(config.decoder.clone());
    let (player, engine_task) = PlaybackEngine::spawn(
        db.clone(),
        status,
        Box::new(backend),
        EngineSettings::from(&config),
    );

    api::run(port, AppContext { player: player.clone() }, shutdown_signal())
        .await
        .context("HTTP server error")?;

    player.shutdown().await;
    if let Err(e) = engine_task.await {
        warn!("Playback engine task ended abnormally: {}", e);
    }
    db.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
