//! Firmware protocol support
//!
//! Supported firmware:
//! - Marlin: temperature auto-reports, UBL mesh bed leveling, probe Z offset

pub mod marlin;
