//! High-level energy meter client.
//!
//! [`EnergyMeterClient`] orchestrates the codec and the adapter session:
//! it loads or discovers the meter's PAN descriptor, establishes the
//! session lazily on the first read, and exposes the uniform sensor
//! contract. Once connected it stays connected; later reads skip the scan
//! and join entirely.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::cache::DescriptorCache;
use crate::error::{Error, FrameError, Result};
use crate::modem::{DEFAULT_RECV_WAIT, DEFAULT_SCAN_DURATION, ModemSession, PanDescriptor};
use crate::protocol::{
    ECHONET_UDP_PORT, Esv, Property, build_edata, build_frame, build_object_id, class, class_group,
    epc, parse_frame,
};
use crate::sensor::{Sensor, SensorKind, SensorMap, SensorValue};
use crate::transport::serial::SerialConfig;
use crate::transport::{LinePort, SerialLinePort};

/// Default cache file name, under the system temp directory.
const CACHE_FILE_NAME: &str = "pan_desc.json";

/// Configuration for the meter client.
#[derive(Debug, Clone)]
pub struct MeterConfig {
    /// Serial device path of the Wi-SUN adapter.
    pub port: String,
    /// Route-B account id.
    pub route_b_id: String,
    /// Route-B account password.
    pub route_b_password: String,
    /// Path of the persisted PAN descriptor.
    pub cache_path: PathBuf,
    /// Cap on response-poll rounds per read. `None` polls indefinitely,
    /// tolerating arbitrary cross-talk on the shared radio channel.
    pub poll_limit: Option<usize>,
    /// Cap on line reads while waiting for a send acknowledgement.
    pub ack_wait_limit: Option<usize>,
}

impl MeterConfig {
    /// Creates a configuration with default cache path and unbounded waits.
    #[must_use]
    pub fn new(
        port: impl Into<String>,
        route_b_id: impl Into<String>,
        route_b_password: impl Into<String>,
    ) -> Self {
        Self {
            port: port.into(),
            route_b_id: route_b_id.into(),
            route_b_password: route_b_password.into(),
            cache_path: std::env::temp_dir().join(CACHE_FILE_NAME),
            poll_limit: None,
            ack_wait_limit: None,
        }
    }

    /// Sets the PAN descriptor cache path.
    #[must_use]
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    /// Caps the response-poll loop of a read.
    #[must_use]
    pub const fn poll_limit(mut self, limit: usize) -> Self {
        self.poll_limit = Some(limit);
        self
    }

    /// Caps the send-acknowledgement wait.
    #[must_use]
    pub const fn ack_wait_limit(mut self, limit: usize) -> Self {
        self.ack_wait_limit = Some(limit);
        self
    }
}

/// Client reading instantaneous power from a smart meter.
pub struct EnergyMeterClient<P> {
    session: ModemSession<P>,
    route_b_id: String,
    route_b_password: String,
    cache: DescriptorCache,
    link_address: Option<String>,
    connected: bool,
    poll_limit: Option<usize>,
}

impl EnergyMeterClient<SerialLinePort> {
    /// Opens the adapter's serial device and creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the serial device cannot be opened.
    pub fn serial(config: &MeterConfig) -> Result<Self> {
        let port = SerialLinePort::open(&SerialConfig::new(&config.port))?;
        Ok(Self::new(ModemSession::new(port), config))
    }
}

impl<P: LinePort> EnergyMeterClient<P> {
    /// Creates a client over an existing session. Tests inject a scripted
    /// port through this seam.
    #[must_use]
    pub fn new(mut session: ModemSession<P>, config: &MeterConfig) -> Self {
        session.set_ack_wait_limit(config.ack_wait_limit);
        Self {
            session,
            route_b_id: config.route_b_id.clone(),
            route_b_password: config.route_b_password.clone(),
            cache: DescriptorCache::new(config.cache_path.clone()),
            link_address: None,
            connected: false,
            poll_limit: config.poll_limit,
        }
    }

    /// Best-effort liveness probe of the adapter; no session required.
    pub async fn ping(&mut self) -> bool {
        self.session.ping().await
    }

    /// Reads the meter's instantaneous power in watts.
    ///
    /// The first call establishes the session: cached descriptor (or a
    /// fresh scan, persisted write-through), credential registration, PAN
    /// join. Subsequent calls reuse the joined session.
    ///
    /// The response poll discards frames that are not the meter's answer —
    /// cross-talk and retransmissions are normal on the shared radio
    /// channel — and keeps polling, unbounded unless
    /// [`MeterConfig::poll_limit`] caps it.
    pub async fn get_value(&mut self) -> Result<u32> {
        if !self.connected {
            self.establish().await?;
        }
        let link = self.link_address.clone().ok_or(Error::NotConnected)?;

        let meter = build_object_id(class_group::HOUSING, class::LOW_VOLTAGE_SMART_METER, 1);
        let controller = build_object_id(class_group::MANAGEMENT, class::CONTROLLER, 1);
        let edata = build_edata(
            controller,
            meter,
            Esv::PropRead,
            &[Property::request(epc::INSTANTANEOUS_POWER)],
        );
        let request = build_frame(&edata, 1);

        let mut polls = 0usize;
        loop {
            if let Some(limit) = self.poll_limit {
                if polls >= limit {
                    return Err(Error::Timeout { reads: polls });
                }
            }
            polls += 1;

            self.session
                .send_udp(&link, ECHONET_UDP_PORT, &request, 1, true)
                .await?;
            let packet = self
                .session
                .recv_udp(&link, DEFAULT_RECV_WAIT)
                .await?
                .unwrap_or_default();

            let frame = parse_frame(&packet)?;
            tracing::debug!(?frame, "received frame");

            let Some(reply) = frame.edata else {
                // Format-2 frames carry nothing decodable.
                continue;
            };
            if reply.seoj != meter {
                continue;
            }
            for prop in &reply.properties {
                if prop.epc != epc::INSTANTANEOUS_POWER {
                    continue;
                }
                let Some(edt) = &prop.edt else { continue };
                if edt.len() != usize::from(prop.pdc) {
                    continue;
                }
                let raw: [u8; 4] =
                    edt.as_ref()
                        .try_into()
                        .map_err(|_| FrameError::Truncated {
                            expected: 4,
                            got: edt.len(),
                        })?;
                return Ok(u32::from_be_bytes(raw));
            }
        }
    }

    /// Reads one polling round as the registry-facing map.
    pub async fn get_value_map(&mut self) -> Result<SensorMap> {
        let power = self.get_value().await?;
        Ok(SensorMap::from([(
            "power".to_owned(),
            SensorValue::Integer(i64::from(power)),
        )]))
    }

    /// Courtesy shutdown of the underlying session.
    pub async fn disconnect(&mut self) {
        self.session.disconnect().await;
        self.connected = false;
        self.link_address = None;
    }

    async fn establish(&mut self) -> Result<()> {
        let descriptor = self.pan_descriptor().await?;

        self.session.set_id(&self.route_b_id).await?;
        self.session.set_password(&self.route_b_password).await?;

        let link = self
            .session
            .connect(&descriptor)
            .await?
            .ok_or(Error::ConnectFailed)?;
        tracing::debug!("joined PAN, link address {link}");

        self.link_address = Some(link);
        self.connected = true;
        Ok(())
    }

    /// Cached descriptor, or a fresh scan persisted write-through.
    async fn pan_descriptor(&mut self) -> Result<PanDescriptor> {
        if let Some(descriptor) = self.cache.load().await {
            return Ok(descriptor);
        }

        let descriptor = self
            .session
            .scan_channel(DEFAULT_SCAN_DURATION)
            .await?
            .ok_or(Error::ScanFailed)?;
        self.cache.store(&descriptor).await;
        Ok(descriptor)
    }
}

impl<P: LinePort> Sensor for EnergyMeterClient<P> {
    fn name(&self) -> &str {
        "echonet_energy"
    }

    fn kind(&self) -> SensorKind {
        SensorKind::Serial
    }

    fn ping(&mut self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(EnergyMeterClient::ping(self))
    }

    fn get_value_map(&mut self) -> Pin<Box<dyn Future<Output = Result<SensorMap>> + Send + '_>> {
        Box::pin(EnergyMeterClient::get_value_map(self))
    }
}
