//! Configuration for Printcal
//!
//! Supports JSON and TOML files, chosen by extension, stored by default in
//! the platform configuration directory. Missing keys fall back to their
//! defaults so a file only needs to list what it changes.

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Serial connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Last used port; empty when none was chosen
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Upper bound on a single blocking read
    pub read_timeout_ms: u64,
    /// Pause after a read error before reading again
    pub error_backoff_ms: u64,
    /// Read buffer size in bytes
    pub read_buffer_size: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: 250000,
            read_timeout_ms: 500,
            error_backoff_ms: 200,
            read_buffer_size: 1024,
        }
    }
}

/// Bed-leveling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingSettings {
    /// How long a leveling run may take
    pub timeout_secs: u64,
}

impl Default for LevelingSettings {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

/// Preheat targets in °C
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureSettings {
    pub hotend_preheat: f64,
    pub bed_preheat: f64,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            hotend_preheat: 210.0,
            bed_preheat: 60.0,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Leveling settings
    pub leveling: LevelingSettings,
    /// Preheat targets
    pub temperature: TemperatureSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config_dir>/printcal/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("printcal").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory on this platform".into())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from `path`, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let connection = &self.connection;
        if connection.baud_rate == 0 {
            return Err(SettingsError::invalid("connection.baud_rate", "must be > 0"));
        }
        if connection.read_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "connection.read_timeout_ms",
                "must be > 0",
            ));
        }
        if connection.read_buffer_size == 0 {
            return Err(SettingsError::invalid(
                "connection.read_buffer_size",
                "must be > 0",
            ));
        }

        if self.leveling.timeout_secs == 0 {
            return Err(SettingsError::invalid("leveling.timeout_secs", "must be > 0"));
        }

        for (key, value) in [
            ("temperature.hotend_preheat", self.temperature.hotend_preheat),
            ("temperature.bed_preheat", self.temperature.bed_preheat),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::invalid(key, "must be a positive number"));
            }
        }

        Ok(())
    }
}
