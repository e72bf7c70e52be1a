//! Probe Z-offset calibration
//!
//! The offset is found by zeroing it, homing, lowering the nozzle in small
//! steps until it just touches the bed, then storing the reached Z as the
//! new offset.

use crate::client::PrinterClient;
use printcal_core::{Error, Result};

/// Jog increments offered for lowering the nozzle, in millimetres
pub const JOG_STEPS: [f64; 6] = [1.0, 0.1, 0.05, -0.05, -0.1, -1.0];

/// Reset → jog → apply workflow over a connected client
pub struct ZOffsetCalibration<'a> {
    client: &'a PrinterClient,
    current_z: f64,
    armed: bool,
}

impl<'a> ZOffsetCalibration<'a> {
    /// Start a calibration; call [`reset`](Self::reset) before jogging
    pub fn new(client: &'a PrinterClient) -> Self {
        Self {
            client,
            current_z: 0.0,
            armed: false,
        }
    }

    /// Zero the offset, home, move to Z0 and enable jogging
    pub fn reset(&mut self) -> Result<()> {
        self.armed = false;
        self.current_z = 0.0;
        self.client.reset_z_offset()?;
        self.armed = true;
        Ok(())
    }

    /// Move the nozzle by `delta` mm and return the new Z
    pub fn jog(&mut self, delta: f64) -> Result<f64> {
        self.ensure_armed()?;
        let target = self.current_z + delta;
        self.client.move_to_z(target)?;
        self.current_z = target;
        Ok(target)
    }

    /// Store the current Z as the probe offset and save to EEPROM
    pub fn apply(&mut self) -> Result<f64> {
        self.ensure_armed()?;
        self.client.apply_z_offset(self.current_z)?;
        self.client.save_settings()?;
        self.armed = false;
        Ok(self.current_z)
    }

    /// Z the nozzle was last moved to
    pub fn current_z(&self) -> f64 {
        self.current_z
    }

    /// Whether jog and apply are allowed
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    fn ensure_armed(&self) -> Result<()> {
        if self.armed {
            Ok(())
        } else {
            Err(Error::other("Reset the Z offset before jogging or applying"))
        }
    }
}
