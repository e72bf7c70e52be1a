//! Printer client
//!
//! Wires the transport to the inbound decoding pipeline and exposes the
//! printer operations as fixed Marlin command sequences.
//!
//! Inbound data flows transport → log channel → line buffer → telemetry
//! extractor and bed-leveling detector → telemetry / bed-level channels.
//! Outbound commands are written straight to the transport from the
//! caller's thread.

use crate::communication::line_buffer::LineBuffer;
use crate::communication::serial::{NativePortOpener, PortOpener};
use crate::communication::transport::{Transport, TransportConfig};
use crate::communication::CommunicatorListener;
use crate::firmware::marlin::bed_leveling::BedLevelDetector;
use crate::firmware::marlin::commands::{self, Heater};
use crate::firmware::marlin::temperature::TelemetryExtractor;
use parking_lot::Mutex;
use printcal_core::{BedLevelEvent, EventBroadcaster, Result, RoutineError, TelemetrySample};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Reader thread tuning
    pub transport: TransportConfig,
    /// How long a bed-leveling run may take before it is abandoned
    pub leveling_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            leveling_timeout: Duration::from_secs(5 * 60),
        }
    }
}

struct LevelingSession {
    detector: BedLevelDetector,
    completion: mpsc::Sender<()>,
}

/// Decodes inbound chunks; runs on the transport's reader thread
struct InboundPipeline {
    events: Arc<EventBroadcaster>,
    lines: Mutex<LineBuffer>,
    telemetry: TelemetryExtractor,
    leveling: Mutex<Option<LevelingSession>>,
}

impl InboundPipeline {
    fn handle_line(&self, line: &str) {
        if let Some(sample) = self.telemetry.extract(line) {
            self.events.telemetry.emit(&sample);
        }

        let status = {
            let mut leveling = self.leveling.lock();
            let Some(session) = leveling.as_mut() else {
                return;
            };
            let observation = session.detector.observe(line);
            if observation.completed {
                // capacity 1: a second signal could only be redundant
                let _ = session.completion.try_send(());
            }
            observation.status
        };

        if let Some(status) = status {
            tracing::debug!("Bed leveling: {}", status);
            self.events.bed_level.emit(&BedLevelEvent::Status(status));
        }
    }
}

impl CommunicatorListener for InboundPipeline {
    fn on_connected(&self, _port: &str) {
        self.lines.lock().clear();
    }

    fn on_error(&self, error: &str) {
        self.events.log.emit(&format!("{}\n", error));
    }

    fn on_data_received(&self, data: &[u8]) {
        self.events
            .log
            .emit(&String::from_utf8_lossy(data).into_owned());

        let lines = self.lines.lock().consume(data);
        for line in &lines {
            self.handle_line(line);
        }
    }
}

/// Tears the leveling session down if the waiting future is dropped
///
/// Disarmed by [`take`](Self::take): once a run has resolved, its slot may
/// already hold the next run's session.
struct SessionGuard<'a> {
    leveling: Option<&'a Mutex<Option<LevelingSession>>>,
}

impl SessionGuard<'_> {
    fn take(&mut self) -> Option<LevelingSession> {
        self.leveling.take().and_then(|leveling| leveling.lock().take())
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Some(leveling) = self.leveling.take() {
            leveling.lock().take();
        }
    }
}

/// Control client for one Marlin printer
pub struct PrinterClient {
    transport: Transport,
    pipeline: Arc<InboundPipeline>,
    events: Arc<EventBroadcaster>,
    leveling_timeout: Duration,
}

impl PrinterClient {
    /// Create a client using native serial ports and default settings
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client using native serial ports
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_opener(Arc::new(NativePortOpener), config)
    }

    /// Create a client that opens ports through `opener`
    pub fn with_opener(opener: Arc<dyn PortOpener>, config: ClientConfig) -> Self {
        let events = Arc::new(EventBroadcaster::new());
        let pipeline = Arc::new(InboundPipeline {
            events: events.clone(),
            lines: Mutex::new(LineBuffer::new()),
            telemetry: TelemetryExtractor::new(),
            leveling: Mutex::new(None),
        });
        let transport = Transport::new(opener, pipeline.clone(), config.transport);

        Self {
            transport,
            pipeline,
            events,
            leveling_timeout: config.leveling_timeout,
        }
    }

    // Connection

    /// Open `port` at `baud_rate`
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<()> {
        self.transport.connect(port, baud_rate)
    }

    /// Close the connection; a no-op when not connected
    pub fn disconnect(&self) -> Result<()> {
        self.transport.disconnect()
    }

    /// True while a connection is open
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<String> {
        self.transport.port_name()
    }

    /// Send one command line; blank input is ignored
    pub fn send_raw(&self, command: &str) -> Result<()> {
        self.transport.send_raw(command)
    }

    /// Drop any partially received line
    pub fn clear_line_buffer(&self) {
        self.pipeline.lines.lock().clear();
    }

    // Listeners

    /// Receive raw serial traffic and read-error notices
    pub fn add_log_listener<F>(&self, listener: F)
    where
        F: Fn(&String) + Send + Sync + 'static,
    {
        self.events.log.register(listener);
    }

    /// Receive temperature samples while monitoring is on
    pub fn add_telemetry_listener<F>(&self, listener: F)
    where
        F: Fn(&TelemetrySample) + Send + Sync + 'static,
    {
        self.events.telemetry.register(listener);
    }

    /// Receive bed-leveling session events
    pub fn add_bed_level_listener<F>(&self, listener: F)
    where
        F: Fn(&BedLevelEvent) + Send + Sync + 'static,
    {
        self.events.bed_level.register(listener);
    }

    /// The client's event channels
    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    // Printer operations

    fn send_sequence(&self, sequence: &[&str]) -> Result<()> {
        for command in sequence {
            self.send_raw(command)?;
        }
        Ok(())
    }

    /// Zero the probe offset, home, and move to Z0
    pub fn reset_z_offset(&self) -> Result<()> {
        self.send_sequence(&commands::RESET_Z_OFFSET)
    }

    /// Move the nozzle to absolute `z`
    pub fn move_to_z(&self, z: f64) -> Result<()> {
        self.send_raw(&commands::move_to_z(z)?)
    }

    /// Set the probe Z offset to `z`
    pub fn apply_z_offset(&self, z: f64) -> Result<()> {
        self.send_raw(&commands::set_z_offset(z)?)
    }

    /// Store settings to EEPROM
    pub fn save_settings(&self) -> Result<()> {
        self.send_raw(commands::SAVE_SETTINGS)
    }

    /// Enable temperature telemetry and ask the firmware to auto-report
    pub fn start_temperature_monitoring(&self) -> Result<()> {
        self.pipeline.telemetry.set_monitoring(true);
        self.send_raw(commands::START_TEMPERATURE_REPORTS)
    }

    /// Disable temperature telemetry and stop auto-reports
    pub fn stop_temperature_monitoring(&self) -> Result<()> {
        self.pipeline.telemetry.set_monitoring(false);
        self.send_raw(commands::STOP_TEMPERATURE_REPORTS)
    }

    /// Whether temperature samples are being emitted
    pub fn is_monitoring(&self) -> bool {
        self.pipeline.telemetry.is_monitoring()
    }

    /// Set the hotend target temperature
    pub fn preheat_hotend(&self, celsius: f64) -> Result<()> {
        self.send_raw(&commands::set_temperature(Heater::Hotend, celsius)?)
    }

    /// Set the bed target temperature
    pub fn preheat_bed(&self, celsius: f64) -> Result<()> {
        self.send_raw(&commands::set_temperature(Heater::Bed, celsius)?)
    }

    /// Print the mesh validation pattern
    pub fn print_validation_pattern(&self) -> Result<()> {
        self.send_raw(commands::VALIDATION_PATTERN)
    }

    /// True while a bed-leveling run is in progress
    pub fn is_leveling(&self) -> bool {
        self.pipeline.leveling.lock().is_some()
    }

    /// Run the bed-leveling routine and wait for the firmware to finish
    ///
    /// Sends the leveling sequence, then waits until the printer reports the
    /// mesh saved and loaded, or the leveling timeout elapses. Whichever
    /// comes first resolves the run; the other outcome is ignored. A command
    /// that cannot be sent ends the run immediately.
    pub async fn run_bed_leveling(&self) -> Result<()> {
        let (mut guard, mut completion) = {
            let mut leveling = self.pipeline.leveling.lock();
            if leveling.is_some() {
                return Err(RoutineError::AlreadyRunning.into());
            }
            let (tx, rx) = mpsc::channel(1);
            let mut detector = BedLevelDetector::new();
            detector.begin();
            *leveling = Some(LevelingSession {
                detector,
                completion: tx,
            });
            (
                SessionGuard {
                    leveling: Some(&self.pipeline.leveling),
                },
                rx,
            )
        };

        self.clear_line_buffer();
        tracing::info!("Starting bed leveling routine");
        self.events.bed_level.emit(&BedLevelEvent::Started);

        for command in commands::BED_LEVELING_SEQUENCE {
            if let Err(e) = self.send_raw(command) {
                drop(guard.take());
                let reason = e.to_string();
                tracing::warn!("Bed leveling aborted at '{}': {}", command, reason);
                self.events
                    .bed_level
                    .emit(&BedLevelEvent::Failed(reason.clone()));
                return Err(RoutineError::CommandFailure {
                    command: command.to_string(),
                    reason,
                }
                .into());
            }
        }

        let signalled = tokio::time::timeout(self.leveling_timeout, completion.recv())
            .await
            .is_ok_and(|signal| signal.is_some());

        // A completion that raced the deadline still counts: the detector
        // refuses to time out once complete.
        let completed = guard
            .take()
            .map_or(signalled, |mut session| !session.detector.time_out());

        if completed {
            tracing::info!("Bed leveling complete");
            self.events.bed_level.emit(&BedLevelEvent::Completed);
            Ok(())
        } else {
            let timeout_ms = u64::try_from(self.leveling_timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!("Bed leveling timed out after {}ms", timeout_ms);
            self.events.bed_level.emit(&BedLevelEvent::TimedOut);
            Err(RoutineError::Timeout { timeout_ms }.into())
        }
    }
}

impl Default for PrinterClient {
    fn default() -> Self {
        Self::new()
    }
}
