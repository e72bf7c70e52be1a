//! Temperature report decoding
//!
//! Marlin reports temperatures as `T:<current> /<target> B:<current> /<target>`,
//! either as a reply to M105 or unsolicited once M155 auto-reports are on.

use printcal_core::{TelemetrySample, TemperatureReading};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

fn hotend_regex() -> &'static Regex {
    static HOTEND_REGEX: OnceLock<Regex> = OnceLock::new();
    HOTEND_REGEX
        .get_or_init(|| Regex::new(r"T:([0-9.]+)\s*/\s*([0-9.]+)").expect("invalid hotend regex"))
}

fn bed_regex() -> &'static Regex {
    static BED_REGEX: OnceLock<Regex> = OnceLock::new();
    BED_REGEX
        .get_or_init(|| Regex::new(r"B:([0-9.]+)\s*/\s*([0-9.]+)").expect("invalid bed regex"))
}

fn capture(regex: &Regex, line: &str) -> Option<TemperatureReading> {
    regex
        .captures(line)
        .map(|caps| TemperatureReading::new(&caps[1], &caps[2]))
}

/// Decode the hotend and bed readings in `line`
///
/// Returns `None` when the line reports neither heater.
pub fn parse_temperature_report(line: &str) -> Option<TelemetrySample> {
    let sample = TelemetrySample {
        hotend: capture(hotend_regex(), line),
        bed: capture(bed_regex(), line),
    };
    (!sample.is_empty()).then_some(sample)
}

/// Temperature decoding gated by the monitoring flag
#[derive(Debug, Default)]
pub struct TelemetryExtractor {
    monitoring: AtomicBool,
}

impl TelemetryExtractor {
    /// Create an extractor with monitoring off
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn sample production on or off
    pub fn set_monitoring(&self, enabled: bool) {
        self.monitoring.store(enabled, Ordering::SeqCst);
    }

    /// Whether samples are currently produced
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Sample for `line`, or `None` when monitoring is off or nothing matched
    pub fn extract(&self, line: &str) -> Option<TelemetrySample> {
        if !self.is_monitoring() {
            return None;
        }
        parse_temperature_report(line)
    }
}
