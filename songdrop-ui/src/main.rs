//! songdrop-ui - song submission form service
//!
//! Serves the submission form on localhost and forwards submissions to the
//! hosted backend (row store, object storage, OAuth).

use anyhow::{Context, Result};
use clap::Parser;
use songdrop_common::config::ConfigResolver;
use songdrop_common::events::EventBus;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use songdrop_ui::backend::{BackendContext, SupabaseBackend};
use songdrop_ui::AppState;

/// Command-line arguments; these take priority over environment and file config
#[derive(Debug, Parser)]
#[command(name = "songdrop-ui", version, about = "Song submission form service")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "SONGDROP_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend project URL
    #[arg(long)]
    backend_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing first so config resolution warnings are visible
    let logging = songdrop_ui::logging::init_tracing();

    // Build identification before any network setup
    info!(
        "Starting songdrop-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = ConfigResolver::new(args.config.clone())
        .load()
        .context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.backend_url {
        config.backend.url = Some(url);
    }

    if logging.apply_config_level(&config.logging.level) {
        info!("Log filter set to '{}' from config", config.logging.level);
    }

    config.validate()?;

    let backend_url = config.backend_url()?;
    let backend = SupabaseBackend::new(
        &backend_url,
        &config.api_key()?,
        Duration::from_secs(config.backend.request_timeout_secs),
    )?;
    info!("Backend: {}", backend_url);
    info!(
        "Table '{}', buckets '{}' (song) and '{}' (cover)",
        config.storage.table, config.storage.song_bucket, config.storage.cover_bucket
    );

    let event_bus = EventBus::new(100);
    let state = AppState::new(BackendContext::supabase(backend), &config, event_bus);
    let app = songdrop_ui::build_router(state);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("songdrop-ui listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
