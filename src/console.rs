//! Console command interpreter
//!
//! Lines typed into the headless console are either raw G-code, forwarded
//! as-is, or a `:`-prefixed command mapped onto a client operation.

use printcal_communication::{Heater, PrinterClient, ZOffsetCalibration};
use printcal_core::{Result, RoutineError};
use printcal_settings::TemperatureSettings;
use std::fmt;
use std::sync::Arc;

/// One parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Forward the line to the printer unchanged
    Raw(String),
    /// `:level`, start the bed-leveling routine in the background
    Level,
    /// `:validate`, print the mesh validation pattern
    Validate,
    /// `:monitor on|off`
    Monitor(bool),
    /// Preheat a heater; `None` uses the configured target
    Preheat(Heater, Option<f64>),
    /// `:reset-z`, zero the offset, home and arm jogging
    ResetZ,
    /// `:jog <delta>`, move Z by `delta` mm
    Jog(f64),
    /// `:apply-z`, store the jogged Z as the probe offset
    ApplyZ,
    /// `:save`, write settings to EEPROM
    Save,
    /// `:help`
    Help,
    /// `:quit` or `:q`
    Quit,
}

/// Why a `:` command could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

/// Console usage text
pub const HELP: &str = "\
Commands:
  :level                       run bed leveling in the background
  :validate                    print the mesh validation pattern
  :monitor on|off              temperature reports
  :preheat hotend|bed [temp]   set a heater target
  :reset-z                     zero the Z offset and home
  :jog <delta>                 move Z by delta mm
  :apply-z                     store the current Z as offset and save
  :save                        M500
  :quit
Anything else is sent to the printer as-is.";

fn parse_number(text: &str) -> std::result::Result<f64, ParseError> {
    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError(format!("'{}' is not a number", text)))
}

impl ConsoleCommand {
    /// Parse a console line
    pub fn parse(line: &str) -> std::result::Result<Self, ParseError> {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Self::Raw(line.to_string()));
        };

        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let parsed = match (name, args.as_slice()) {
            ("level", []) => Self::Level,
            ("validate", []) => Self::Validate,
            ("monitor", ["on"]) => Self::Monitor(true),
            ("monitor", ["off"]) => Self::Monitor(false),
            ("preheat", [heater, rest @ ..]) if rest.len() <= 1 => {
                let heater = match *heater {
                    "hotend" => Heater::Hotend,
                    "bed" => Heater::Bed,
                    other => return Err(ParseError(format!("unknown heater '{}'", other))),
                };
                let target = rest.first().map(|t| parse_number(t)).transpose()?;
                Self::Preheat(heater, target)
            }
            ("reset-z", []) => Self::ResetZ,
            ("jog", [delta]) => Self::Jog(parse_number(delta)?),
            ("apply-z", []) => Self::ApplyZ,
            ("save", []) => Self::Save,
            ("help", []) => Self::Help,
            ("quit", []) | ("q", []) => Self::Quit,
            _ => return Err(ParseError(format!("unrecognised command ':{}'", command))),
        };
        Ok(parsed)
    }
}

/// Runs console commands against one client
pub struct Console<'a> {
    client: &'a Arc<PrinterClient>,
    calibration: ZOffsetCalibration<'a>,
    preheat: TemperatureSettings,
}

impl<'a> Console<'a> {
    /// Console over `client`; `preheat` supplies targets for bare `:preheat`
    pub fn new(client: &'a Arc<PrinterClient>, preheat: TemperatureSettings) -> Self {
        Self {
            client,
            calibration: ZOffsetCalibration::new(client),
            preheat,
        }
    }

    /// Execute `command`; returns a line of feedback for the user, if any
    ///
    /// `Level` only starts the routine: it runs as a tokio task so the
    /// console keeps accepting input, and its outcome is reported through
    /// the bed-level listeners. Must be called within a tokio runtime.
    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Option<String>> {
        let feedback = match command {
            ConsoleCommand::Raw(line) => {
                self.client.send_raw(&line)?;
                None
            }
            ConsoleCommand::Level => {
                if self.client.is_leveling() {
                    return Err(RoutineError::AlreadyRunning.into());
                }
                let client = Arc::clone(self.client);
                tokio::spawn(async move {
                    if let Err(e) = client.run_bed_leveling().await {
                        tracing::warn!("Bed leveling ended: {}", e);
                    }
                });
                Some("Bed leveling started".to_string())
            }
            ConsoleCommand::Validate => {
                self.client.print_validation_pattern()?;
                Some("Printing validation pattern".to_string())
            }
            ConsoleCommand::Monitor(true) => {
                self.client.start_temperature_monitoring()?;
                Some("Temperature monitoring on".to_string())
            }
            ConsoleCommand::Monitor(false) => {
                self.client.stop_temperature_monitoring()?;
                Some("Temperature monitoring off".to_string())
            }
            ConsoleCommand::Preheat(heater, target) => {
                let celsius = match heater {
                    Heater::Hotend => {
                        let celsius = target.unwrap_or(self.preheat.hotend_preheat);
                        self.client.preheat_hotend(celsius)?;
                        celsius
                    }
                    Heater::Bed => {
                        let celsius = target.unwrap_or(self.preheat.bed_preheat);
                        self.client.preheat_bed(celsius)?;
                        celsius
                    }
                };
                Some(format!("Heating {} to {:.0}°C", heater, celsius))
            }
            ConsoleCommand::ResetZ => {
                self.calibration.reset()?;
                Some("Z offset reset, jogging enabled".to_string())
            }
            ConsoleCommand::Jog(delta) => {
                let z = self.calibration.jog(delta)?;
                Some(format!("Z = {:.3}", z))
            }
            ConsoleCommand::ApplyZ => {
                let z = self.calibration.apply()?;
                Some(format!("Z offset {:.3} applied and saved", z))
            }
            ConsoleCommand::Save => {
                self.client.save_settings()?;
                Some("Settings saved".to_string())
            }
            ConsoleCommand::Help => Some(HELP.to_string()),
            ConsoleCommand::Quit => None,
        };
        Ok(feedback)
    }
}
