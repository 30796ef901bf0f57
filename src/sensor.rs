//! Uniform sensor-driver contract.
//!
//! The surrounding project polls heterogeneous sensors (serial, I2C,
//! analog) through one interface; the registry uses the metadata to decide
//! whether a missing device is fatal at startup. Only the contract lives
//! here; the registry itself is an external collaborator.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a sensor is attached, resolved once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Serial-attached device with its own session.
    Serial,
    /// Register-poke I2C device.
    I2c {
        /// Bus number.
        bus: u8,
        /// Device address.
        address: u8,
    },
}

impl SensorKind {
    /// Registry-facing label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::I2c { .. } => "i2c",
        }
    }
}

/// A single reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    /// Integer reading (counts, watts).
    Integer(i64),
    /// Floating-point reading.
    Float(f64),
    /// Boolean reading.
    Bool(bool),
}

/// Named readings of one polling round.
pub type SensorMap = HashMap<String, SensorValue>;

/// Trait for sensor drivers.
pub trait Sensor: Send {
    /// Stable driver name.
    fn name(&self) -> &str;

    /// Attachment kind.
    fn kind(&self) -> SensorKind;

    /// Whether a missing device is fatal at startup.
    fn required(&self) -> bool {
        false
    }

    /// Best-effort liveness probe; never errors.
    fn ping(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    /// Reads all values of one polling round.
    fn get_value_map(&mut self) -> Pin<Box<dyn Future<Output = Result<SensorMap>> + Send + '_>>;
}
