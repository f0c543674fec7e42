use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use niluflix_core::{
    config::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH},
    load_config, validate_config, Config, ConfigError, DownloadManager, FileOrganizer,
    TorrentClient, TorrentClientDetector, TorrentSearchEngine,
};
use niluflix_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Loads the config file. A missing default file means "all defaults"; a
/// missing file named by `NILUFLIX_CONFIG` is an error.
fn load(path: &Path, explicit: bool) -> Result<Config> {
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) if !explicit => {
            warn!("No config file at {:?}, using defaults", path);
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load config from {:?}", path)),
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(version = VERSION, "Starting niluflix");

    // Determine config path
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let config_path = explicit
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    info!("Loading configuration from {:?}", config_path);
    let config = load(&config_path, explicit.is_some())?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;
    info!("Library path: {:?}", config.library.base_path);

    // Library folders
    let layout = config.library.layout();
    layout
        .ensure_directories()
        .await
        .context("Failed to create library directories")?;

    // Torrent daemon (detect, install if allowed)
    let torrent_client = TorrentClientDetector::new(config.torrent_client.clone())
        .detect()
        .await
        .context("No torrent daemon available")?;
    info!("Using torrent client: {}", torrent_client.name());

    // Search providers
    let search = Arc::new(
        TorrentSearchEngine::from_config(config.search.clone())
            .context("Failed to create search engine")?,
    );
    for provider in search.providers().await {
        info!(
            provider = %provider.name,
            enabled = provider.enabled,
            "Search provider registered"
        );
    }

    // Organizer
    let organizer = Arc::new(FileOrganizer::new(layout.clone(), config.organizer.clone()));

    // Download manager
    let manager = Arc::new(DownloadManager::new(
        config.downloads.clone(),
        torrent_client,
        search,
        organizer,
        layout.downloads_dir(),
    ));
    manager.start();

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, Arc::clone(&manager)));

    // Create router
    let app = create_router(state);

    // Start server
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    manager.stop();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
