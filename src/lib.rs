//! # Printcal
//!
//! Serial control client for Marlin 3D printers, focused on the calibration
//! chores done from a terminal: probe Z-offset, preheating, temperature
//! monitoring and unified bed leveling.
//!
//! ## Architecture
//!
//! 1. **printcal-core** - Error types, event payloads and the event broadcaster
//! 2. **printcal-communication** - Serial transport, Marlin decoding, printer client
//! 3. **printcal-settings** - Persisted configuration
//! 4. **printcal** - Logging setup and the headless console binary

pub mod console;

pub use printcal_communication::{
    list_ports, ClientConfig, Heater, PrinterClient, SerialPortInfo, TransportConfig,
    ZOffsetCalibration, SUPPORTED_BAUD_RATES,
};
pub use printcal_core::{
    BedLevelEvent, ConnectionError, Error, EventBroadcaster, Result, RoutineError,
    TelemetrySample, TemperatureReading,
};
pub use printcal_settings::{Config, SettingsError};

use std::time::Duration;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Runtime client configuration from persisted settings
pub fn client_config(config: &Config) -> ClientConfig {
    let connection = &config.connection;
    ClientConfig {
        transport: TransportConfig {
            read_timeout: Duration::from_millis(connection.read_timeout_ms),
            error_backoff: Duration::from_millis(connection.error_backoff_ms),
            read_buffer_size: connection.read_buffer_size,
        },
        leveling_timeout: Duration::from_secs(config.leveling.timeout_secs),
    }
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr, leaving stdout to printer traffic
/// - RUST_LOG environment variable support
/// - INFO as the default level
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_line_number(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
