//! songbird-rec - Playlist "spice-up" recommendation service
//!
//! Takes a list of songs and returns deduplicated, scored,
//! diversity-filtered recommendations from Last.fm, optionally mapped to
//! Deezer track IDs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use songbird_common::config::{config_file_path, resolve_port, TomlConfig};
use songbird_rec::enrich::DeezerClient;
use songbird_rec::provider::LastfmClient;
use songbird_rec::recommend::{Aggregator, AggregatorOptions};
use songbird_rec::AppState;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for songbird-rec
#[derive(Parser, Debug)]
#[command(name = "songbird-rec")]
#[command(about = "Playlist recommendation service for Songbird")]
#[command(version)]
struct Args {
    /// Path to config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides SONGBIRD_PORT and config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config_file_path(args.config.as_deref())?;
    let config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize tracing
    let default_filter = format!(
        "songbird_rec={level},songbird_common={level},tower_http=debug",
        level = config.logging.level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting songbird-rec recommendation service");
    info!("Version: {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_HASH"));
    info!("Built: {}", env!("BUILD_TIMESTAMP"));
    info!("Config: {}", config_path.display());

    let lastfm = LastfmClient::from_config(&config).context("Failed to initialize Last.fm client")?;
    let mut aggregator = Aggregator::new(Arc::new(lastfm))
        .with_options(AggregatorOptions::from(&config.recommend));

    let deezer = DeezerClient::from_config(&config)
        .context("Failed to initialize Deezer client")?
        .map(Arc::new);
    if let Some(deezer) = &deezer {
        aggregator = aggregator.with_converter(deezer.clone());
        info!("Deezer enrichment enabled");
    } else {
        info!("Deezer enrichment disabled");
    }

    let mut state = AppState::new(aggregator);
    if let Some(deezer) = deezer {
        state = state.with_catalog(deezer);
    }

    let app = songbird_rec::build_router(state).layer(TraceLayer::new_for_http());

    let port = resolve_port(args.port, &config)?;
    let bind = args.bind.unwrap_or_else(|| config.bind_address.clone());
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("songbird-rec stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
