//! Line reassembly for the inbound byte stream
//!
//! Serial reads return arbitrary slices of the printer's output. The buffer
//! keeps the unterminated tail of the last read and hands out whole lines
//! once their terminator arrives.

/// Protocol line terminator
pub const LINE_TERMINATOR: u8 = b'\n';

/// Carry-over buffer that splits read chunks into complete lines
///
/// Invariant: `pending` holds exactly the bytes received since the last
/// terminator. Bytes are buffered before decoding, so a multi-byte UTF-8
/// sequence split across two reads is decoded intact.
#[derive(Debug, Default, Clone)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completed, in order
    ///
    /// Returned lines exclude the terminator. Anything after the last
    /// terminator stays buffered for the next call.
    pub fn consume(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == LINE_TERMINATOR) {
            self.pending.extend_from_slice(&rest[..pos]);
            lines.push(String::from_utf8_lossy(&self.pending).into_owned());
            self.pending.clear();
            rest = &rest[pos + 1..];
        }

        self.pending.extend_from_slice(rest);
        lines
    }

    /// Bytes received since the last terminator
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// True when no partial line is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop any partially received line
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
