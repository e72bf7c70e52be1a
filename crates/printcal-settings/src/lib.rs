//! Printcal Settings Crate
//!
//! Persisted configuration: connection defaults, the bed-leveling watchdog
//! and preheat targets.

pub mod config;
pub mod error;

pub use config::{Config, ConnectionSettings, LevelingSettings, TemperatureSettings};
pub use error::{SettingsError, SettingsResult};
