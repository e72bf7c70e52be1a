//! Serial communication layer
//!
//! - [`serial`]: the port abstraction and the native `serialport` backend
//! - [`transport`]: connection lifecycle, background read loop and writes
//! - [`line_buffer`]: reassembly of newline-terminated lines from read chunks

pub mod line_buffer;
pub mod serial;
pub mod transport;

/// Receives connection lifecycle and inbound data notifications
///
/// Every method except `on_data_received` has an empty default. Callbacks for
/// inbound data and read errors run on the connection's reader thread.
pub trait CommunicatorListener: Send + Sync {
    /// A connection to `port` was opened
    fn on_connected(&self, _port: &str) {}

    /// The connection was closed
    fn on_disconnected(&self) {}

    /// A recoverable error occurred on the reader thread
    fn on_error(&self, _error: &str) {}

    /// A non-empty chunk was read from the port
    fn on_data_received(&self, data: &[u8]);
}
