//! Error handling for Printcal
//!
//! Provides the error types for every layer of the client:
//! - Connection errors (opening, writing to and reading from the port)
//! - Routine errors (multi-command firmware procedures such as bed leveling)
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Connection error type
///
/// Lifecycle and I/O failures of the serial connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A connection is already open
    #[error("Already connected to {port}")]
    AlreadyConnected {
        /// The port that is currently open.
        port: String,
    },

    /// The port could not be opened or configured
    #[error("Failed to open {port}: {reason}")]
    OpenFailure {
        /// The port that failed to open.
        port: String,
        /// The reason reported by the operating system.
        reason: String,
    },

    /// No connection is open
    #[error("Not connected")]
    NotConnected,

    /// Writing a command to the port failed
    #[error("Write to {port} failed: {reason}")]
    WriteFailed {
        /// The port being written.
        port: String,
        /// The underlying I/O error.
        reason: String,
    },

    /// A non-timeout read failure; the read loop recovers from these
    #[error("Read error: {reason}")]
    TransientRead {
        /// The underlying I/O error.
        reason: String,
    },
}

/// Routine error type
///
/// Failures of fixed firmware command sequences that wait on device output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutineError {
    /// The routine did not report completion within its wait window
    #[error("Routine timed out after {timeout_ms}ms")]
    Timeout {
        /// The wait window in milliseconds.
        timeout_ms: u64,
    },

    /// A command of the routine's sequence could not be sent
    #[error("Routine command '{command}' failed: {reason}")]
    CommandFailure {
        /// The command that failed.
        command: String,
        /// Why it failed.
        reason: String,
    },

    /// Another session of the routine is still active
    #[error("Routine already running")]
    AlreadyRunning,
}

/// Main error type for Printcal
///
/// A unified error type that can represent any error from all layers.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Routine error
    #[error(transparent)]
    Routine(#[from] RoutineError),

    /// A numeric argument cannot be sent to the firmware
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Routine(RoutineError::Timeout { .. }))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }

    /// Check if this is a routine error
    pub fn is_routine_error(&self) -> bool {
        matches!(self, Error::Routine(_))
    }

    /// Check if this is the not-connected error
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Error::Connection(ConnectionError::NotConnected))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
