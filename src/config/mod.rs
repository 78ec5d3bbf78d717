//! Configuration file management
//!
//! Loads TOML configuration and provides input normalization settings.
//! Default config path: ~/.config/evnorm/config.toml
//!
//! Configuration is read-only; nothing is ever written back.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input normalization settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text production settings
    pub text: TextConfig,
    /// Fallback keymap settings
    pub keymap: KeymapConfig,
    /// Error reporting settings
    pub errors: ErrorConfig,
}

/// Text production settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Attach UTF-8 text to key presses (default: true)
    pub enabled: bool,
    /// Use the locale's compose table for dead keys (default: true)
    pub compose: bool,
    /// Locale override for compose table lookup (empty = LC_ALL/LC_CTYPE/LANG)
    pub locale: String,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            compose: true,
            locale: String::new(),
        }
    }
}

/// Fallback keymap, compiled from RMLVO names
///
/// Used only by backends that can receive key events before the windowing
/// system has delivered a keymap. All fields empty means "no fallback".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeymapConfig {
    /// XKB rules (empty = default)
    pub rules: String,
    /// XKB keyboard model (empty = default)
    pub model: String,
    /// XKB keyboard layout (e.g., "us", "de", empty = default)
    pub layout: String,
    /// XKB keyboard variant (empty = default)
    pub variant: String,
    /// XKB keyboard options (e.g., "ctrl:nocaps", empty = default)
    pub options: String,
}

impl KeymapConfig {
    /// True when any name is set
    pub fn is_configured(&self) -> bool {
        [
            &self.rules,
            &self.model,
            &self.layout,
            &self.variant,
            &self.options,
        ]
        .iter()
        .any(|s| !s.is_empty())
    }
}

/// Error reporting settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Log every error returned from a context operation at warn level
    pub log_on_throw: bool,
}

impl Config {
    /// Environment variable naming an explicit config file
    pub const ENV_VAR: &'static str = "EVNORM_CONFIG";

    const SYSTEM_CONFIG_PATH: &'static str = "/etc/evnorm/config.toml";

    /// Get the path that would be used for loading config
    ///
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. EVNORM_CONFIG environment variable
        if let Ok(path) = std::env::var(Self::ENV_VAR) {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/evnorm/config.toml
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("evnorm").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }
        }

        // 3. System config: /etc/evnorm/config.toml
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. EVNORM_CONFIG environment variable
    /// 2. ~/.config/evnorm/config.toml (user config)
    /// 3. /etc/evnorm/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {:#}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
