//! Serial line-port implementation.
//!
//! Opens the Wi-SUN adapter's serial device and exposes it as a
//! [`LinePort`] with a fixed per-line read timeout.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};

use crate::error::{Error, Result};
use crate::transport::{LineDecoder, LinePort};

/// Default baud rate of the adapter.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default per-line read timeout.
///
/// Bounded waits in the session are iteration counts; the effective
/// wall-clock bound of a wait is `iterations x this timeout`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the serial line port.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "/dev/ttyAMA0").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Per-line read timeout.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the per-line read timeout.
    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

/// Serial [`LinePort`] backed by a `tokio_serial::SerialStream`.
pub struct SerialLinePort {
    stream: SerialStream,
    decoder: LineDecoder,
    read_timeout: Duration,
}

impl SerialLinePort {
    /// Opens the serial device with the adapter's 8E1 framing.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        tracing::info!("opening serial port: {}", config.port);

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .open_native_async()
            .map_err(Error::Serial)?;

        Ok(Self {
            stream,
            decoder: LineDecoder::new(),
            read_timeout: config.read_timeout,
        })
    }
}

impl LinePort for SerialLinePort {
    fn read_line(&mut self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>> {
        Box::pin(async move {
            if let Some(line) = self.decoder.next_line() {
                tracing::trace!("recv: [{line}]");
                return Ok(line);
            }

            let deadline = Instant::now() + self.read_timeout;
            let mut buf = [0u8; 256];
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::trace!("read timed out");
                    return Ok(String::new());
                }

                match tokio::time::timeout(remaining, self.stream.read(&mut buf)).await {
                    Ok(Ok(0)) => {
                        return Err(Error::Io(std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            "serial port closed",
                        )));
                    }
                    Ok(Ok(n)) => {
                        self.decoder.feed(&buf[..n]);
                        if let Some(line) = self.decoder.next_line() {
                            tracing::trace!("recv: [{line}]");
                            return Ok(line);
                        }
                    }
                    Ok(Err(e)) => return Err(Error::Io(e)),
                    Err(_) => {
                        tracing::trace!("read timed out");
                        return Ok(String::new());
                    }
                }
            }
        })
    }

    fn write_all(&mut self, data: &[u8]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let data = data.to_vec();
        Box::pin(async move {
            tracing::trace!("send: {} bytes", data.len());
            self.stream.write_all(&data).await.map_err(Error::Io)?;
            self.stream.flush().await.map_err(Error::Io)?;
            Ok(())
        })
    }

    fn clear_input(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.decoder.clear();
            self.stream
                .clear(ClearBuffer::Input)
                .map_err(Error::Serial)?;
            Ok(())
        })
    }

    fn clear_output(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.stream
                .clear(ClearBuffer::Output)
                .map_err(Error::Serial)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyAMA0");
        assert_eq!(config.port, "/dev/ttyAMA0");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0")
            .baud_rate(9600)
            .read_timeout(Duration::from_secs(1));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout, Duration::from_secs(1));
    }
}
