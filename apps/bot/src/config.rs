//! Bot configuration.
//!
//! Stored as TOML at `~/.config/arcferry/bot.toml` (override with
//! `ARCFERRY_CONFIG`). Individual paths can also be overridden through
//! `ARCFERRY_DOWNLOAD_DIR` and `ARCFERRY_RCLONE_CONF`, which is how the
//! containerized deployment points them at mounted volumes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Root of the per-archive working directories.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// rclone config file holding the destination remotes.
    #[serde(default = "default_rclone_conf")]
    pub rclone_conf: PathBuf,

    /// Base URL of the archive host.
    #[serde(default = "default_archive_base_url")]
    pub archive_base_url: String,
}

fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("arcferry").join("downloads")
}

fn default_rclone_conf() -> PathBuf {
    home_dir().join(".config").join("rclone").join("rclone.conf")
}

fn default_archive_base_url() -> String {
    "https://archive.org".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            rclone_conf: default_rclone_conf(),
            archive_base_url: default_archive_base_url(),
        }
    }
}

impl BotConfig {
    /// Loads configuration from disk, falling back to defaults when no
    /// file exists, then applies env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            BotConfig::default()
        };

        if let Ok(dir) = std::env::var("ARCFERRY_DOWNLOAD_DIR") {
            config.download_dir = PathBuf::from(dir);
        }
        if let Ok(conf) = std::env::var("ARCFERRY_RCLONE_CONF") {
            config.rclone_conf = PathBuf::from(conf);
        }

        Ok(config)
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ARCFERRY_CONFIG") {
        return PathBuf::from(path);
    }
    home_dir().join(".config").join("arcferry").join("bot.toml")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}
