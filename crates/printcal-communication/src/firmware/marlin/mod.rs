//! Marlin firmware support
//!
//! Marlin speaks line-oriented G-code over serial. This module holds the
//! outbound command vocabulary and the decoders for the unsolicited output
//! the calibration workflows depend on.

pub mod bed_leveling;
pub mod commands;
pub mod temperature;
pub mod z_offset;
