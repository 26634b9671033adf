use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::filter::{ExportLayout, DEFAULT_MESSAGE_LOG, MACOS_METADATA_DIR};
use crate::package::RecencyStrategy;

const APP_DIR_NAME: &str = "chat-export-merge";

/// Cross-platform configuration directory manager
pub struct ConfigManager;

impl ConfigManager {
    /// Get the main configuration directory path following platform conventions:
    /// - Linux: $XDG_CONFIG_HOME/chat-export-merge or ~/.config/chat-export-merge
    /// - macOS: ~/Library/Application Support/chat-export-merge
    /// - Windows: %APPDATA%\chat-export-merge
    pub fn config_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            // Follow XDG Base Directory Specification
            if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
                Ok(PathBuf::from(xdg_config).join(APP_DIR_NAME))
            } else {
                let home = dirs::home_dir().context("Failed to get home directory")?;
                Ok(home.join(".config").join(APP_DIR_NAME))
            }
        }

        #[cfg(target_os = "macos")]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home
                .join("Library")
                .join("Application Support")
                .join(APP_DIR_NAME))
        }

        #[cfg(target_os = "windows")]
        {
            Ok(dirs::config_dir()
                .context("Failed to get Windows config directory")?
                .join(APP_DIR_NAME))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let home = dirs::home_dir().context("Failed to get home directory")?;
            Ok(home.join(format!(".{APP_DIR_NAME}")))
        }
    }

    /// Get the settings file path (config.toml)
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the latest combine report path
    pub fn latest_report_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("latest-combine-report.json"))
    }

    /// Get the log file path
    pub fn log_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(format!("{APP_DIR_NAME}.log")))
    }

    /// Ensure the configuration directory exists
    pub fn ensure_config_dir() -> Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir).with_context(|| {
            format!("Failed to create config directory: {}", config_dir.display())
        })?;
        Ok(config_dir)
    }
}

/// Persistent settings for inspecting and combining exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// File name of the message log inside an export
    #[serde(default = "default_message_log")]
    pub message_log_file_name: String,

    /// Platform metadata directories that are never part of an export
    #[serde(default = "default_metadata_dirs")]
    pub metadata_dirs: Vec<String>,

    /// Extra glob-style patterns for archive paths to ignore
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// How same-path files from different archives are ranked
    #[serde(default)]
    pub recency: RecencyStrategy,

    /// Directory combined archives are written to (default: current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_message_log() -> String {
    DEFAULT_MESSAGE_LOG.to_string()
}

fn default_metadata_dirs() -> Vec<String> {
    vec![MACOS_METADATA_DIR.to_string()]
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            message_log_file_name: default_message_log(),
            metadata_dirs: default_metadata_dirs(),
            exclude_patterns: Vec::new(),
            recency: RecencyStrategy::default(),
            output_dir: None,
        }
    }
}

impl MergeConfig {
    /// Load configuration from file, falling back to defaults when none exists
    pub fn load() -> Result<Self> {
        let config_path = ConfigManager::config_file_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: MergeConfig = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the inspector cannot honor.
    ///
    /// The message log is matched by its last path segment, so its name must be a
    /// plain file name.
    pub fn validate(&self) -> Result<()> {
        let name = &self.message_log_file_name;
        if name.is_empty() || name.contains('/') || name.contains('\\') {
            anyhow::bail!("Message log file name must be a plain file name, got '{name}'");
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = ConfigManager::config_file_path()?;
        ConfigManager::ensure_config_dir()?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Export layout described by these settings
    pub fn layout(&self) -> ExportLayout {
        ExportLayout {
            message_log: self.message_log_file_name.clone(),
            metadata_dirs: self.metadata_dirs.clone(),
            exclude_patterns: self.exclude_patterns.clone(),
        }
    }
}
