use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CLEAR_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS, CONTEXT_TIMEOUT_SECS, DEFAULT_BASE_URL,
    SEND_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base endpoint of the analysis service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Terminal front-end configuration
    #[serde(default)]
    pub ui: UIConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeouts: TimeoutConfig::default(),
            ui: UIConfig::default(),
        }
    }
}

/// Per-operation timeouts, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub send_secs: u64,
    pub clear_secs: u64,
    pub context_secs: u64,
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_secs: SEND_TIMEOUT_SECS,
            clear_secs: CLEAR_TIMEOUT_SECS,
            context_secs: CONTEXT_TIMEOUT_SECS,
            connect_secs: CONNECT_TIMEOUT_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn send(&self) -> Duration {
        Duration::from_secs(self.send_secs)
    }

    pub fn clear(&self) -> Duration {
        Duration::from_secs(self.clear_secs)
    }

    pub fn context(&self) -> Duration {
        Duration::from_secs(self.context_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIConfig {
    /// Colorize terminal output
    pub color: bool,
    /// Print a timestamp next to each message
    pub show_timestamps: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            color: true,
            show_timestamps: false,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(".flightchat/config.toml");
    load_config_from(&[global_config, local_config])
}

/// Layer defaults, the given TOML files (later wins) and `FLIGHTCHAT_` env vars
pub fn load_config_from(files: &[PathBuf]) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    for file in files {
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }
    }

    // FLIGHTCHAT_BASE_URL, FLIGHTCHAT_TIMEOUTS__SEND_SECS, ...
    figment = figment.merge(Env::prefixed("FLIGHTCHAT_").split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

/// Load an explicit configuration file, still honoring env overrides
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    load_config_from(&[path.to_path_buf()])
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "flightchat") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        // Fallback to home directory
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("flightchat");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<PathBuf> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        tracing::info!(path = %config_file.display(), "created default configuration");
    }

    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeouts.send(), Duration::from_secs(90));
        assert!(config.timeouts.clear() < config.timeouts.send());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"http://analysis.local:9000\"\n\n[timeouts]\nsend_secs = 30\n",
        )
        .unwrap();

        let config = load_config_from(&[path]).unwrap();
        assert_eq!(config.base_url, "http://analysis.local:9000");
        assert_eq!(config.timeouts.send_secs, 30);
        // Untouched keys keep their defaults
        assert_eq!(config.timeouts.clear_secs, CLEAR_TIMEOUT_SECS);
        assert!(config.ui.color);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&[dir.path().join("nope.toml")]).unwrap();
        assert_eq!(config.timeouts, TimeoutConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = Config::default();
        config.ui.show_timestamps = true;

        save_config(&config, Some(path.clone())).unwrap();
        let loaded = load_config_file(&path).unwrap();
        assert!(loaded.ui.show_timestamps);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_file(&dir.path().join("absent.toml")).is_err());
    }
}
