//! Marlin command vocabulary
//!
//! The literal command strings sent for each printer operation. They are a
//! compatibility contract with the firmware: temperatures are whole degrees,
//! Z positions carry three decimals.

use printcal_core::{Error, Result};

/// Zero the probe Z offset, home, then move the nozzle to Z0
pub const RESET_Z_OFFSET: [&str; 3] = ["M851 Z0", "G28", "G0 Z0"];

/// Store settings to EEPROM
pub const SAVE_SETTINGS: &str = "M500";

/// Start temperature auto-reports, one per second
pub const START_TEMPERATURE_REPORTS: &str = "M155 S1";

/// Stop temperature auto-reports
pub const STOP_TEMPERATURE_REPORTS: &str = "M155 S0";

/// Unified bed leveling: restore settings, report the probe offset, home,
/// probe the mesh, fill the remainder, save and load slot 0, enable
/// compensation
pub const BED_LEVELING_SEQUENCE: [&str; 8] = [
    "M501", "M851", "G28", "G29 P1", "G29 P3", "G29 S0", "G29 L0", "M420 S1",
];

/// Mesh validation pattern at 220°C with a 0.15 mm first layer
pub const VALIDATION_PATTERN: &str = "G26 H220 P0.5 L0.15";

/// Heater addressed by a set-temperature command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heater {
    /// Extruder hotend
    Hotend,
    /// Heated bed
    Bed,
}

impl Heater {
    fn code(self) -> &'static str {
        match self {
            Self::Hotend => "M104",
            Self::Bed => "M140",
        }
    }
}

impl std::fmt::Display for Heater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hotend => write!(f, "hotend"),
            Self::Bed => write!(f, "bed"),
        }
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid_parameter(name, format!("{} is not a finite number", value)))
    }
}

/// Rapid move to absolute Z, e.g. `G0 Z0.150`
pub fn move_to_z(z: f64) -> Result<String> {
    ensure_finite("z", z)?;
    Ok(format!("G0 Z{:.3}", z))
}

/// Set the probe Z offset, e.g. `M851 Z-1.250`
pub fn set_z_offset(z: f64) -> Result<String> {
    ensure_finite("z_offset", z)?;
    Ok(format!("M851 Z{:.3}", z))
}

/// Set a heater target without waiting, e.g. `M104 S210`
pub fn set_temperature(heater: Heater, celsius: f64) -> Result<String> {
    ensure_finite("temperature", celsius)?;
    if celsius < 0.0 {
        return Err(Error::invalid_parameter(
            "temperature",
            format!("{} target must not be negative", heater),
        ));
    }
    Ok(format!("{} S{:.0}", heater.code(), celsius))
}
