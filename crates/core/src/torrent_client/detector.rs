//! Startup detection of a usable torrent daemon.
//!
//! Checks the configured backend (or every known backend) and, when nothing
//! answers, installs and starts a default daemon before checking once more.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use super::{create_torrent_client, TorrentClient, TorrentClientBackend, TorrentClientConfig};

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("No torrent client found. Install Transmission or qBittorrent and make sure its RPC interface is enabled")]
    NoTorrentClientFound,
}

/// Installs and starts a default torrent daemon.
#[async_trait]
pub trait DaemonInstaller: Send + Sync {
    async fn install(&self) -> anyhow::Result<()>;
}

/// Runs a fixed sequence of shell commands.
pub struct CommandInstaller {
    commands: Vec<String>,
}

impl CommandInstaller {
    pub fn new(commands: Vec<String>) -> Self {
        Self { commands }
    }

    /// Installer for the current platform.
    ///
    /// A configured `install_command` always wins. Without one, macOS installs
    /// Transmission through Homebrew and other platforms have no installer.
    pub fn for_platform(config: &TorrentClientConfig) -> Option<Self> {
        if let Some(command) = &config.install_command {
            return Some(Self::new(vec![command.clone()]));
        }
        if cfg!(target_os = "macos") {
            return Some(Self::new(vec![
                "brew install transmission".to_string(),
                "brew services start transmission".to_string(),
            ]));
        }
        None
    }
}

#[async_trait]
impl DaemonInstaller for CommandInstaller {
    async fn install(&self) -> anyhow::Result<()> {
        for command in &self.commands {
            info!(command = %command, "Running torrent daemon installer");
            let status = Command::new("sh")
                .arg("-c")
                .arg(command)
                .status()
                .await
                .with_context(|| format!("failed to run `{}`", command))?;
            if !status.success() {
                bail!("`{}` exited with {}", command, status);
            }
        }
        Ok(())
    }
}

/// Selects a torrent client backend at startup.
pub struct TorrentClientDetector {
    config: TorrentClientConfig,
    installer: Option<Arc<dyn DaemonInstaller>>,
}

impl TorrentClientDetector {
    pub fn new(config: TorrentClientConfig) -> Self {
        let installer = CommandInstaller::for_platform(&config)
            .map(|i| Arc::new(i) as Arc<dyn DaemonInstaller>);
        Self { config, installer }
    }

    /// Replace the installer (or disable it with `None`).
    pub fn with_installer(mut self, installer: Option<Arc<dyn DaemonInstaller>>) -> Self {
        self.installer = installer;
        self
    }

    /// Backends in detection order: the configured one first, then the defaults.
    fn detection_order(&self) -> Vec<TorrentClientBackend> {
        let mut order = Vec::with_capacity(2);
        if let Some(backend) = self.config.backend {
            order.push(backend);
        }
        for backend in [
            TorrentClientBackend::Transmission,
            TorrentClientBackend::Qbittorrent,
        ] {
            if !order.contains(&backend) {
                order.push(backend);
            }
        }
        order
    }

    async fn detect_once(&self) -> Option<Arc<dyn TorrentClient>> {
        for backend in self.detection_order() {
            let client = match create_torrent_client(backend, &self.config) {
                Ok(client) => client,
                Err(e) => {
                    warn!(backend = backend.as_str(), error = %e, "Failed to build torrent client");
                    continue;
                }
            };
            if client.is_connected().await {
                info!(backend = backend.as_str(), "Torrent client detected");
                return Some(client);
            }
        }
        None
    }

    /// Find a running daemon, installing one if allowed.
    ///
    /// After an install attempt there is exactly one more detection pass;
    /// a miss is fatal.
    pub async fn detect(&self) -> Result<Arc<dyn TorrentClient>, DetectError> {
        if let Some(client) = self.detect_once().await {
            return Ok(client);
        }

        if !self.config.auto_install {
            return Err(DetectError::NoTorrentClientFound);
        }

        match &self.installer {
            Some(installer) => {
                warn!("No torrent client responded, attempting install");
                if let Err(e) = installer.install().await {
                    warn!(error = %format!("{:#}", e), "Torrent daemon install failed");
                }
            }
            None => warn!("No torrent client responded and no installer is available"),
        }

        tokio::time::sleep(Duration::from_secs(self.config.install_wait_secs)).await;

        self.detect_once()
            .await
            .ok_or(DetectError::NoTorrentClientFound)
    }
}
