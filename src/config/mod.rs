//! Configuration management module.
//!
//! Loads the viewer configuration from a JSON file next to the executable.
//! The file is optional and never written back.

use crate::core::view::DrawingMode;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "graphviz_viewer_config.json";

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_layout_command")]
    pub layout_command: String,
    /// Graphviz engine passed as `-K<engine>` (neato, fdp, circo, ...).
    #[serde(default)]
    pub layout_engine: Option<String>,
    #[serde(default = "default_encoding")]
    pub source_encoding: String,
    #[serde(default)]
    pub drawing_mode: DrawingMode,
    #[serde(default = "default_fit_margin")]
    pub fit_margin: f32,
    #[serde(default)]
    pub show_background: bool,
    #[serde(default)]
    pub show_outline: bool,
    #[serde(default = "default_true")]
    pub high_quality_antialiasing: bool,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_layout_command() -> String {
    "dot".to_string()
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_fit_margin() -> f32 {
    80.0
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            layout_command: default_layout_command(),
            layout_engine: None,
            source_encoding: default_encoding(),
            drawing_mode: DrawingMode::default(),
            fit_margin: default_fit_margin(),
            show_background: false,
            show_outline: false,
            high_quality_antialiasing: true,
        }
    }
}

/// Configuration manager for loading config.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_path(Self::get_exe_directory().join(CONFIG_FILE_NAME))
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Get the directory containing the executable.
    fn get_exe_directory() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the config file path.
    pub fn get_config_file_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from file, falling back to defaults.
    pub fn load(&self) -> Config {
        if !self.config_path.exists() {
            return Config::default();
        }

        let mut config = match self.try_load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring config file: {:#}", e);
                return Config::default();
            }
        };

        // Sanitize values the viewer cannot work with
        if config.poll_interval_ms == 0 {
            config.poll_interval_ms = default_poll_interval_ms();
        }
        if config.layout_command.trim().is_empty() {
            config.layout_command = default_layout_command();
        }
        if config.source_encoding.is_empty() {
            config.source_encoding = default_encoding();
        }
        if !config.fit_margin.is_finite() || config.fit_margin < 0.0 {
            config.fit_margin = default_fit_margin();
        }

        log::info!("Loaded config from {}", self.config_path.display());
        config
    }

    fn try_load(&self) -> anyhow::Result<Config> {
        let content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("reading {}", self.config_path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.config_path.display()))?;
        Ok(config)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
