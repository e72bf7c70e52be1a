//! # Printcal Core
//!
//! Core types shared by the Printcal crates: the error taxonomy, the typed
//! event payloads produced while talking to a printer, and the broadcaster
//! that fans those events out to registered listeners.

pub mod error;
pub mod event_bus;

pub use error::{ConnectionError, Error, Result, RoutineError};

pub use event_bus::{
    BedLevelEvent, Channel, EventBroadcaster, EventCategory, Listener, TelemetrySample,
    TemperatureReading,
};
