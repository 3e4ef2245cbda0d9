//! Application and engine configuration
//!
//! The engine's product-tuning constants (blend window, caffeine dip) are
//! fixed by design but exposed here as configuration rather than buried
//! inline, since they have no derived justification and may be retuned.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::logging::LogSettings;
use crate::waveform::CaffeineDipSettings;

/// Engine tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Width of the measured-to-forecast transition window for "today"
    pub blend_window_hours: usize,

    /// Caffeine withdrawal dip settings
    pub caffeine: CaffeineDipSettings,

    /// Demo/test mode: sample-free days yield a fixed neutral placeholder
    pub simulated_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            blend_window_hours: 3,
            caffeine: CaffeineDipSettings::default(),
            simulated_mode: false,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging setup
    #[serde(default)]
    pub logging: LogSettings,

    /// Forecast cache database location (in-memory store when unset)
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl AppConfig {
    /// Default config file location under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("energyrs").join("config.toml"))
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, the default location, or fall back to
    /// built-in defaults when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Write configuration to a TOML file, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, contents)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }
}
