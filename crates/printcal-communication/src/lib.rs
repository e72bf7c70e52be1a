//! # Printcal Communication
//!
//! Serial transport and Marlin protocol handling for Printcal.
//!
//! The [`PrinterClient`] owns one serial connection, decodes the inbound byte
//! stream into lines, extracts temperature telemetry and bed-leveling
//! progress from them, and exposes the printer operations used during
//! calibration as fixed G-code command sequences.

pub mod client;
pub mod communication;
pub mod firmware;

pub use client::{ClientConfig, PrinterClient};

pub use communication::{
    line_buffer::LineBuffer,
    serial::{
        list_ports, NativePortOpener, PortOpener, SerialPort, SerialPortInfo,
        SUPPORTED_BAUD_RATES,
    },
    transport::{Transport, TransportConfig},
    CommunicatorListener,
};

pub use firmware::marlin::{
    bed_leveling::{BedLevelDetector, LevelingState, LineObservation},
    commands::Heater,
    temperature::{parse_temperature_report, TelemetryExtractor},
    z_offset::ZOffsetCalibration,
};
