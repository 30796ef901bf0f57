//! # echonet-meter
//!
//! A Rust client library for reading smart electricity meters over a
//! Wi-SUN route-B serial adapter.
//!
//! The library drives the adapter's `SK` command set to scan for the
//! meter's PAN, join it, and exchange ECHONET Lite datagrams with the
//! low-voltage smart meter object.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Pure ECHONET Lite frame codec, usable without any hardware
//! - Lazy session establishment with a persistent PAN descriptor cache
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use echonet_meter::{EnergyMeterClient, MeterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), echonet_meter::Error> {
//!     let config = MeterConfig::new(
//!         "/dev/ttyUSB0",
//!         "00112233445566778899AABBCCDDEEFF",
//!         "ROUTE-B-PASSWORD",
//!     );
//!     let mut client = EnergyMeterClient::serial(&config)?;
//!
//!     if !client.ping().await {
//!         eprintln!("adapter not responding");
//!         return Ok(());
//!     }
//!
//!     // First read scans and joins; later reads reuse the session.
//!     let watts = client.get_value().await?;
//!     println!("instantaneous power: {watts} W");
//!
//!     client.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - ECHONET Lite codec (frames, properties, object ids)
//! - [`transport`] - Line-oriented serial transport
//! - [`modem`] - Wi-SUN adapter session over the `SK` command set
//! - [`cache`] - Persistent PAN descriptor cache
//! - [`sensor`] - Uniform sensor-driver contract
//! - [`client`] - High-level [`EnergyMeterClient`]

pub mod cache;
pub mod client;
pub mod error;
pub mod modem;
pub mod protocol;
pub mod sensor;
pub mod transport;

// Re-exports for convenience
pub use cache::DescriptorCache;
pub use client::{EnergyMeterClient, MeterConfig};
pub use error::{Error, FrameError, Result};
pub use modem::{ModemSession, PanDescriptor, SessionState};
pub use protocol::{EData, Esv, Frame, Property, parse_frame};
pub use sensor::{Sensor, SensorKind, SensorMap, SensorValue};
pub use transport::{LinePort, SerialLinePort, serial::SerialConfig};
