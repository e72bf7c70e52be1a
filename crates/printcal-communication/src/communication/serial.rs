//! Serial port access
//!
//! Provides the port abstraction used by the transport and the native
//! implementation backed by the `serialport` crate.
//!
//! Supports:
//! - Port enumeration filtered to likely printer boards
//! - Opening a port at a baud rate with a bounded read timeout
//! - Cloning a port so reads and writes can proceed from different threads

use printcal_core::{ConnectionError, Error, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Baud rates offered for Marlin boards, most common first
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [250000, 115200, 57600, 38400, 19200, 9600];

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }
}

/// List serial ports that look like printer boards
///
/// Printer mainboards enumerate as USB-serial adapters or CDC-ACM devices:
/// - Windows: COM*
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => Ok(ports
            .iter()
            .filter(|port| is_printer_port(&port.port_name))
            .map(|port| {
                let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

                match &port.port_type {
                    serialport::SerialPortType::UsbPort(usb_info) => {
                        let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                        if let Some(ref mfg) = usb_info.manufacturer {
                            info = info.with_manufacturer(mfg);
                        }
                        if let Some(ref serial) = usb_info.serial_number {
                            info = info.with_serial_number(serial);
                        }
                        info
                    }
                    _ => info,
                }
            })
            .collect()),
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

fn is_printer_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Byte-stream connection to a printer
///
/// `read` must return within the timeout the port was opened with; running
/// out of time is reported as `io::ErrorKind::TimedOut`.
pub trait SerialPort: Send {
    /// Read available bytes into `buf`
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Open a second handle to the same port
    fn try_clone(&self) -> io::Result<Box<dyn SerialPort>>;

    /// Get the port name
    fn name(&self) -> String;
}

/// Opens ports for the transport
pub trait PortOpener: Send + Sync {
    /// Open `port` at `baud_rate`, with reads bounded by `read_timeout`
    fn open(&self, port: &str, baud_rate: u32, read_timeout: Duration)
        -> Result<Box<dyn SerialPort>>;
}

/// Serial port backed by the `serialport` crate
pub struct RealSerialPort {
    name: String,
    port: Box<dyn serialport::SerialPort>,
}

impl SerialPort for RealSerialPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)?;
        self.port.flush()
    }

    fn try_clone(&self) -> io::Result<Box<dyn SerialPort>> {
        let port = self.port.try_clone().map_err(io::Error::from)?;
        Ok(Box::new(RealSerialPort {
            name: self.name.clone(),
            port,
        }))
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Opens [`RealSerialPort`]s, 8N1 without flow control
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePortOpener;

impl PortOpener for NativePortOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn SerialPort>> {
        let builder = serialport::new(port, baud_rate)
            .timeout(read_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None);

        match builder.open() {
            Ok(handle) => Ok(Box::new(RealSerialPort {
                name: port.to_string(),
                port: handle,
            })),
            Err(e) => {
                tracing::error!("Failed to open serial port {}: {}", port, e);
                Err(ConnectionError::OpenFailure {
                    port: port.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }
}
