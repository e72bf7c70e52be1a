//! Event payload definitions for the broadcaster channels.

use serde::{Deserialize, Serialize};

/// Event category, one per broadcaster channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCategory {
    /// Raw serial traffic and read-error notices.
    Log,
    /// Temperature samples.
    Telemetry,
    /// Bed-leveling session events.
    BedLevel,
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventCategory::Log => write!(f, "Log"),
            EventCategory::Telemetry => write!(f, "Telemetry"),
            EventCategory::BedLevel => write!(f, "BedLevel"),
        }
    }
}

/// A current/target pair for one heater, as reported by the firmware
///
/// Values are kept verbatim (e.g. `"200.1"`) so the display shows exactly
/// what the printer sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureReading {
    /// Measured temperature.
    pub current: String,
    /// Set point.
    pub target: String,
}

impl TemperatureReading {
    /// Create a reading from the raw captured values
    pub fn new(current: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            current: current.into(),
            target: target.into(),
        }
    }

    /// Measured temperature in degrees Celsius, if it parses
    pub fn current_celsius(&self) -> Option<f64> {
        self.current.parse().ok()
    }

    /// Set point in degrees Celsius, if it parses
    pub fn target_celsius(&self) -> Option<f64> {
        self.target.parse().ok()
    }
}

impl std::fmt::Display for TemperatureReading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.current, self.target)
    }
}

/// One temperature report line
///
/// A channel the line did not report is `None`, never a zero reading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Hotend (`T:`) reading.
    pub hotend: Option<TemperatureReading>,
    /// Heated bed (`B:`) reading.
    pub bed: Option<TemperatureReading>,
}

impl TelemetrySample {
    /// True when neither channel was reported
    pub fn is_empty(&self) -> bool {
        self.hotend.is_none() && self.bed.is_none()
    }
}

/// Bed-leveling session events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedLevelEvent {
    /// The routine's command sequence is about to be sent.
    Started,
    /// Human-readable progress reported by the firmware.
    Status(String),
    /// The firmware saved and activated the new mesh.
    Completed,
    /// No completion was observed within the wait window.
    TimedOut,
    /// The command sequence could not be sent.
    Failed(String),
}

impl BedLevelEvent {
    /// True for the events that end a session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BedLevelEvent::Completed | BedLevelEvent::TimedOut | BedLevelEvent::Failed(_)
        )
    }

    /// Short description suitable for a status label
    pub fn description(&self) -> String {
        match self {
            BedLevelEvent::Started => "Running bed leveling routine...".to_string(),
            BedLevelEvent::Status(line) => line.clone(),
            BedLevelEvent::Completed => "Mesh saved and bed leveling activated.".to_string(),
            BedLevelEvent::TimedOut => "Bed leveling timed out.".to_string(),
            BedLevelEvent::Failed(reason) => format!("Bed leveling failed: {}", reason),
        }
    }
}
