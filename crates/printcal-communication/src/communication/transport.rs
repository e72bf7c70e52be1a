//! Serial transport
//!
//! Owns at most one open connection. Opening a connection starts a reader
//! thread that performs bounded-timeout reads and hands every non-empty chunk
//! to the transport's [`CommunicatorListener`]; commands are written from the
//! caller's thread under the connection lock.

use super::serial::{PortOpener, SerialPort};
use super::CommunicatorListener;
use parking_lot::Mutex;
use printcal_core::{ConnectionError, Result};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Reader thread tuning
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound on a single blocking read; also the worst-case delay
    /// before the reader notices a disconnect
    pub read_timeout: Duration,
    /// Pause after a non-timeout read error before reading again
    pub error_backoff: Duration,
    /// Size of the read buffer in bytes
    pub read_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(500),
            error_backoff: Duration::from_millis(200),
            read_buffer_size: 1024,
        }
    }
}

struct Link {
    port_name: String,
    writer: Box<dyn SerialPort>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

/// Connection lifecycle, writes and the background read loop
pub struct Transport {
    opener: Arc<dyn PortOpener>,
    listener: Arc<dyn CommunicatorListener>,
    config: TransportConfig,
    link: Mutex<Option<Link>>,
}

impl Transport {
    /// Create a disconnected transport
    pub fn new(
        opener: Arc<dyn PortOpener>,
        listener: Arc<dyn CommunicatorListener>,
        config: TransportConfig,
    ) -> Self {
        Self {
            opener,
            listener,
            config,
            link: Mutex::new(None),
        }
    }

    /// Open `port` at `baud_rate` and start the reader thread
    pub fn connect(&self, port: &str, baud_rate: u32) -> Result<()> {
        let mut link = self.link.lock();
        if let Some(existing) = link.as_ref() {
            return Err(ConnectionError::AlreadyConnected {
                port: existing.port_name.clone(),
            }
            .into());
        }

        let writer = self
            .opener
            .open(port, baud_rate, self.config.read_timeout)?;
        let open_failure = |e: io::Error| ConnectionError::OpenFailure {
            port: port.to_string(),
            reason: e.to_string(),
        };
        let reader_port = writer.try_clone().map_err(open_failure)?;

        let stop = Arc::new(AtomicBool::new(false));
        // the reader waits for this so no data is delivered before on_connected
        let (start_tx, start_rx) = mpsc::channel::<()>();

        let reader = {
            let stop = stop.clone();
            let listener = self.listener.clone();
            let config = self.config.clone();
            thread::Builder::new()
                .name(format!("printcal-reader {}", port))
                .spawn(move || {
                    if start_rx.recv().is_ok() {
                        read_loop(reader_port, stop, listener, config);
                    }
                })
                .map_err(open_failure)?
        };

        self.listener.on_connected(port);
        let _ = start_tx.send(());

        *link = Some(Link {
            port_name: port.to_string(),
            writer,
            stop,
            reader: Some(reader),
        });
        tracing::info!("Connected to {} @ {} baud", port, baud_rate);
        Ok(())
    }

    /// Stop the reader and close the port; a no-op when not connected
    ///
    /// The reader observes the stop flag after its current read returns, so
    /// this waits at most one read timeout. Called from the reader thread
    /// itself (e.g. inside a listener), it returns without waiting.
    pub fn disconnect(&self) -> Result<()> {
        let Some(mut link) = self.link.lock().take() else {
            return Ok(());
        };

        link.stop.store(true, Ordering::Release);
        let reader = link.reader.take();
        let port_name = link.port_name.clone();
        drop(link);

        if let Some(handle) = reader {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::warn!("Reader thread for {} panicked", port_name);
            }
        }

        self.listener.on_disconnected();
        tracing::info!("Disconnected from {}", port_name);
        Ok(())
    }

    /// Send one command line
    ///
    /// Surrounding whitespace is trimmed. A blank command is accepted and
    /// nothing is written. Otherwise the command plus a newline is written
    /// in a single call under the connection lock.
    pub fn send_raw(&self, command: &str) -> Result<()> {
        let command = command.trim();
        if command.is_empty() {
            return Ok(());
        }

        let mut link = self.link.lock();
        let link = link.as_mut().ok_or(ConnectionError::NotConnected)?;

        let payload = format!("{}\n", command);
        link.writer
            .write_all(payload.as_bytes())
            .map_err(|e| ConnectionError::WriteFailed {
                port: link.port_name.clone(),
                reason: e.to_string(),
            })?;
        tracing::debug!("TX {}: {}", link.port_name, command);
        Ok(())
    }

    /// True while a connection is open
    pub fn is_connected(&self) -> bool {
        self.link.lock().is_some()
    }

    /// Name of the open port
    pub fn port_name(&self) -> Option<String> {
        self.link.lock().as_ref().map(|link| link.port_name.clone())
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().as_ref() {
            link.stop.store(true, Ordering::Release);
        }
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

fn read_loop(
    mut port: Box<dyn SerialPort>,
    stop: Arc<AtomicBool>,
    listener: Arc<dyn CommunicatorListener>,
    config: TransportConfig,
) {
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];

    while !stop.load(Ordering::Acquire) {
        match port.read(&mut buf) {
            Ok(0) => continue,
            Ok(n) => listener.on_data_received(&buf[..n]),
            Err(e) if is_timeout(&e) => continue,
            Err(e) => {
                let error = ConnectionError::TransientRead {
                    reason: e.to_string(),
                };
                tracing::warn!("{} on {}", error, port.name());
                listener.on_error(&error.to_string());
                thread::sleep(config.error_backoff);
            }
        }
    }

    tracing::debug!("Reader for {} stopped", port.name());
}
