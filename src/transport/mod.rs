//! Transport layer for the Wi-SUN adapter.
//!
//! The adapter speaks a line-oriented (`\r\n`) command protocol, so the
//! abstraction here is a line port rather than a byte stream. Tests supply
//! a scripted in-memory implementation.

pub mod serial;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;

use bytes::{Buf, BytesMut};

use crate::error::Result;

/// Trait for line-port implementations.
pub trait LinePort: Send {
    /// Reads one line, stripped of its terminator.
    ///
    /// An expired read timeout yields an empty string rather than an error,
    /// so callers can run iteration-bounded waits.
    fn read_line(&mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;

    /// Writes raw bytes to the device.
    fn write_all(&mut self, data: &[u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Discards any pending input.
    fn clear_input(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Discards any unsent output.
    fn clear_output(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Incremental decoder splitting a byte stream into lines.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
}

impl LineDecoder {
    /// Creates a new line decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Takes the next complete line, without its `\r\n` terminator.
    ///
    /// Returns `None` if no full line is buffered yet.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line = self.buffer.split_to(pos);
        self.buffer.advance(1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

pub use serial::SerialLinePort;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_complete_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"OK\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_decode_partial_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"EVENT 2");
        assert_eq!(decoder.next_line(), None);
        decoder.feed(b"5 FE80::1\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("EVENT 25 FE80::1"));
    }

    #[test]
    fn test_decode_multiple_lines() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"SKINFO\r\nEINFO FE80::1 001D129012345678 39 8888 FFFE\r\nOK\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("SKINFO"));
        assert!(decoder.next_line().unwrap().starts_with("EINFO"));
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
    }

    #[test]
    fn test_bare_lf_accepted() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"OK\n");
        assert_eq!(decoder.next_line().as_deref(), Some("OK"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_leading_spaces_preserved() {
        // EPANDESC block lines are indented; the indent is significant.
        let mut decoder = LineDecoder::new();
        decoder.feed(b"  Channel:39\r\n");
        assert_eq!(decoder.next_line().as_deref(), Some("  Channel:39"));
    }
}
