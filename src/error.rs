//! Error types for the echonet-meter library.

use thiserror::Error;

/// The main error type for meter operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ECHONET Lite frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The adapter's command echo did not match what was sent.
    ///
    /// The command/response stream has desynchronized; continuing would
    /// corrupt subsequent exchanges, so this is a hard failure.
    #[error("echo mismatch: expected [{expected}], got [{got}]")]
    EchoMismatch { expected: String, got: String },

    /// The adapter answered a command with a non-OK status.
    #[error("command rejected: status [{status}]")]
    Rejected { status: String },

    /// An adapter reply could not be interpreted.
    #[error("unparseable adapter response: [{line}]")]
    BadResponse { line: String },

    /// A bounded wait ran out of reads.
    #[error("timed out after {reads} reads")]
    Timeout { reads: usize },

    /// A channel scan found no PAN to join and no cached descriptor exists.
    #[error("channel scan found no meter")]
    ScanFailed,

    /// The network join did not complete.
    #[error("failed to join the Wi-SUN PAN")]
    ConnectFailed,

    /// No session is established.
    #[error("not connected")]
    NotConnected,
}

/// ECHONET Lite codec errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// A buffer ended before a declared field or length could be read.
    #[error("truncated frame: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },

    /// A frame header byte does not match the protocol constants.
    #[error("bad frame header byte: 0x{value:02x}")]
    BadHeader { value: u8 },
}

/// Result type alias for meter operations.
pub type Result<T> = std::result::Result<T, Error>;
