//! Wi-SUN adapter session.
//!
//! Drives the adapter's half-duplex, line-terminated `SK` command protocol:
//! each command is written with a CRLF terminator, its echo is read back
//! and verified, and a status line follows. Asynchronous `EVENT` lines are
//! interleaved with command replies, so the scan/join operations read in
//! bounded loops watching for the event they need.
//!
//! All waits are iteration counts over the port's per-line read timeout,
//! never wall-clock timers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::transport::LinePort;

/// Scan attempts before giving up.
pub const RETRY_COUNT: usize = 10;

/// Line reads allowed per bounded wait.
pub const WAIT_COUNT: usize = 30;

/// Default dwell-time parameter of the first scan attempt.
pub const DEFAULT_SCAN_DURATION: u8 = 3;

/// Default line reads allowed while waiting for a datagram.
pub const DEFAULT_RECV_WAIT: usize = 10;

/// Dwell time past which a scan gives up instead of escalating further.
const MAX_SCAN_DURATION: u8 = 7;

/// Channel mask covering all 16 candidate channels.
const SCAN_CHANNEL_MASK: u32 = 0xFFFF_FFFF;

// Unsolicited event lines of interest.
const EVENT_BEACON: &str = "EVENT 20";
const EVENT_SCAN_DONE: &str = "EVENT 22";
const EVENT_JOIN_FAILED: &str = "EVENT 24";
const EVENT_JOINED: &str = "EVENT 25";
const EVENT_SESSION_CLOSED: &str = "EVENT 27";

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No PAN joined.
    Disconnected,
    /// Join in progress.
    Joining,
    /// Joined; datagrams can be exchanged.
    Joined,
}

/// Result of a channel scan, as reported by the adapter's `EPANDESC` block.
///
/// All fields keep the adapter's textual hex form; they are echoed back
/// into later commands verbatim. Persisted as an opaque cache blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanDescriptor {
    /// Channel number.
    pub channel: String,
    /// Channel page.
    pub channel_page: String,
    /// PAN id.
    pub pan_id: String,
    /// 64-bit extended address of the meter.
    pub addr: String,
    /// Link quality indicator at scan time.
    pub lqi: String,
    /// Pairing id.
    pub pair_id: String,
}

/// Session with a Wi-SUN adapter over a [`LinePort`].
///
/// The session is the sole owner of the port and of the adapter's radio
/// state; callers wanting concurrent access must serialize calls
/// themselves, since interleaved command/response pairs would desynchronize
/// the echo matching.
pub struct ModemSession<P> {
    port: P,
    state: SessionState,
    link_address: Option<String>,
    ack_wait_limit: Option<usize>,
}

impl<P: LinePort> ModemSession<P> {
    /// Creates a new session over the given port.
    #[must_use]
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: SessionState::Disconnected,
            link_address: None,
            ack_wait_limit: None,
        }
    }

    /// Caps the number of line reads `send_udp` spends waiting for the
    /// adapter's `OK`. `None` (the default) waits indefinitely, matching
    /// the adapter's documented behavior of always acknowledging a send.
    pub fn set_ack_wait_limit(&mut self, limit: Option<usize>) {
        self.ack_wait_limit = limit;
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Link-local address of the joined peer, while [`SessionState::Joined`].
    #[must_use]
    pub fn link_address(&self) -> Option<&str> {
        self.link_address.as_deref()
    }

    /// Best-effort liveness probe.
    ///
    /// Resets the adapter and asks for its info line; any I/O error,
    /// timeout, or malformed reply reads as "not here" rather than an
    /// error, so this never fails.
    pub async fn ping(&mut self) -> bool {
        match self.ping_inner().await {
            Ok(alive) => alive,
            Err(e) => {
                tracing::debug!("ping failed: {e}");
                false
            }
        }
    }

    async fn ping_inner(&mut self) -> Result<bool> {
        self.reset().await?;
        let info = self.command_raw("SKINFO").await?;
        self.expect("OK").await?;
        Ok(info.split(' ').next() == Some("EINFO"))
    }

    /// Resets the adapter and clears both directions of the serial buffers.
    ///
    /// `SKRESET` is the one command whose echo is read but not verified.
    pub async fn reset(&mut self) -> Result<()> {
        self.port.clear_input().await?;
        self.port.clear_output().await?;

        tracing::debug!("reset");
        self.command_unchecked(b"SKRESET").await?;
        self.expect("OK").await
    }

    /// Registers the route-B account id.
    pub async fn set_id(&mut self, id: &str) -> Result<()> {
        self.command(&format!("SKSETRBID {id}")).await?;
        Ok(())
    }

    /// Registers the route-B password. The adapter wants the password
    /// length as a hex prefix.
    pub async fn set_password(&mut self, password: &str) -> Result<()> {
        self.command(&format!("SKSETPWD {:X} {password}", password.len()))
            .await?;
        Ok(())
    }

    /// Reads the adapter's datagram display option register.
    pub async fn read_option(&mut self) -> Result<u8> {
        let payload = self.command("ROPT").await?;
        let value = payload.ok_or_else(|| Error::BadResponse {
            line: String::new(),
        })?;
        u8::from_str_radix(&value, 16).map_err(|_| Error::BadResponse { line: value })
    }

    /// Scans for the meter's PAN, escalating the dwell time.
    ///
    /// Each attempt issues `SKSCAN` over all candidate channels, then reads
    /// events in a bounded loop: a beacon event yields a descriptor block,
    /// a scan-complete event ends the attempt. Failed attempts retry with
    /// `duration + 1`; past a dwell time of 7 the scan gives up.
    ///
    /// Longer dwell times find fainter peers at higher cost, which is why
    /// the escalation starts cheap.
    pub async fn scan_channel(&mut self, start_duration: u8) -> Result<Option<PanDescriptor>> {
        let mut duration = start_duration;
        for _ in 0..RETRY_COUNT {
            self.command(&format!("SKSCAN 2 {SCAN_CHANNEL_MASK:X} {duration}"))
                .await?;

            let mut found = None;
            for _ in 0..WAIT_COUNT {
                let line = self.port.read_line().await?;
                if line.starts_with(EVENT_SCAN_DONE) {
                    break;
                }
                if line.starts_with(EVENT_BEACON) {
                    found = Some(self.read_pan_descriptor().await?);
                }
            }

            if let Some(descriptor) = found {
                tracing::debug!(?descriptor, "scan found meter");
                return Ok(Some(descriptor));
            }

            duration += 1;
            if duration > MAX_SCAN_DURATION {
                return Ok(None);
            }
        }
        Ok(None)
    }

    /// Joins the PAN described by a scan result.
    ///
    /// Writes the channel and PAN id into session registers, converts the
    /// peer's extended address to a link-local address, then joins and
    /// waits for the outcome event. A join-failed event or a timeout with
    /// no event yields `Ok(None)`.
    pub async fn connect(&mut self, descriptor: &PanDescriptor) -> Result<Option<String>> {
        self.state = SessionState::Joining;
        match self.join(descriptor).await {
            Ok(Some(link)) => {
                self.state = SessionState::Joined;
                self.link_address = Some(link.clone());
                Ok(Some(link))
            }
            other => {
                self.state = SessionState::Disconnected;
                self.link_address = None;
                other
            }
        }
    }

    async fn join(&mut self, descriptor: &PanDescriptor) -> Result<Option<String>> {
        self.command(&format!("SKSREG S2 {}", descriptor.channel))
            .await?;
        self.command(&format!("SKSREG S3 {}", descriptor.pan_id))
            .await?;

        let link = self
            .command_raw(&format!("SKLL64 {}", descriptor.addr))
            .await?;

        self.command(&format!("SKJOIN {link}")).await?;

        for _ in 0..WAIT_COUNT {
            let line = self.port.read_line().await?;
            if line.starts_with(EVENT_JOIN_FAILED) {
                tracing::warn!("join failed (EVENT 24)");
                return Ok(None);
            }
            if line.starts_with(EVENT_JOINED) {
                return Ok(Some(link));
            }
        }
        // No outcome event within the bounded wait.
        Ok(None)
    }

    /// Courtesy shutdown of the PAN session.
    ///
    /// Issues the terminate command and waits for its acknowledgement, but
    /// swallows every failure; the session ends up `Disconnected` either
    /// way.
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.terminate().await {
            tracing::debug!("disconnect: {e}");
        }
        self.state = SessionState::Disconnected;
        self.link_address = None;
    }

    async fn terminate(&mut self) -> Result<()> {
        self.command_unchecked(b"SKTERM").await?;
        self.expect("OK").await?;
        for _ in 0..WAIT_COUNT {
            let line = self.port.read_line().await?;
            if line.starts_with(EVENT_SESSION_CLOSED) {
                return Ok(());
            }
        }
        Err(Error::Timeout { reads: WAIT_COUNT })
    }

    /// Sends a datagram to the joined peer.
    ///
    /// The payload rides behind a length-prefixed `SKSENDTO` header on the
    /// same line. The adapter acknowledges with a bare `OK` once the radio
    /// send completes; the wait for it is unbounded unless capped with
    /// [`set_ack_wait_limit`](Self::set_ack_wait_limit).
    pub async fn send_udp(
        &mut self,
        link_address: &str,
        port: u16,
        payload: &[u8],
        handle: u8,
        secure: bool,
    ) -> Result<()> {
        let security = if secure { 1 } else { 2 };
        let header = format!(
            "SKSENDTO {handle} {link_address} {port:04X} {security} {:04X} ",
            payload.len()
        );

        let mut command = Vec::with_capacity(header.len() + payload.len());
        command.extend_from_slice(header.as_bytes());
        command.extend_from_slice(payload);
        self.command_unchecked(&command).await?;

        let mut reads = 0usize;
        loop {
            if let Some(limit) = self.ack_wait_limit {
                if reads >= limit {
                    return Err(Error::Timeout { reads });
                }
            }
            let line = self.port.read_line().await?;
            reads += 1;
            if line.trim_end() == "OK" {
                return Ok(());
            }
        }
    }

    /// Waits for a datagram from the given peer.
    ///
    /// Reads up to `wait_count` lines looking for an `ERXUDP` event whose
    /// source address matches; its hex payload field is decoded to bytes.
    /// Exhausting the wait is the expected "nothing arrived" outcome.
    pub async fn recv_udp(
        &mut self,
        link_address: &str,
        wait_count: usize,
    ) -> Result<Option<Vec<u8>>> {
        for _ in 0..wait_count {
            let line = self.port.read_line().await?;
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }

            let parts: Vec<&str> = line.splitn(10, ' ').collect();
            if parts[0] != "ERXUDP" {
                continue;
            }
            if parts.len() > 8 && parts[1] == link_address {
                // Hex payload field, per the adapter's default WOPT 01 mode.
                let payload = hex::decode(parts[8]).map_err(|_| Error::BadResponse {
                    line: line.to_owned(),
                })?;
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Reads the multi-line `EPANDESC` descriptor block that follows a
    /// beacon event. Lines are two-space indented `Key:Value` pairs; the
    /// `PairID` field terminates the block.
    async fn read_pan_descriptor(&mut self) -> Result<PanDescriptor> {
        self.expect("EPANDESC").await?;

        let mut descriptor = PanDescriptor::default();
        for _ in 0..WAIT_COUNT {
            let line = self.port.read_line().await?;
            if !line.starts_with("  ") {
                return Err(Error::BadResponse { line });
            }

            let Some((key, value)) = line.trim().split_once(':') else {
                return Err(Error::BadResponse { line });
            };
            let value = value.to_owned();
            match key {
                "Channel" => descriptor.channel = value,
                "Channel Page" => descriptor.channel_page = value,
                "Pan ID" => descriptor.pan_id = value,
                "Addr" => descriptor.addr = value,
                "LQI" => descriptor.lqi = value,
                "PairID" => {
                    descriptor.pair_id = value;
                    break;
                }
                _ => {}
            }
        }
        Ok(descriptor)
    }

    /// Writes a command, verifies its echo, and returns the next line.
    async fn command_raw(&mut self, command: &str) -> Result<String> {
        tracing::debug!("send: [{command}]");
        self.port.write_all(command.as_bytes()).await?;
        self.port.write_all(b"\r\n").await?;
        self.expect(command).await?;
        self.port.read_line().await
    }

    /// Writes a command and reads back one line without checking it.
    async fn command_unchecked(&mut self, command: &[u8]) -> Result<()> {
        self.port.write_all(command).await?;
        self.port.write_all(b"\r\n").await?;
        self.port.read_line().await?;
        Ok(())
    }

    /// Writes a command expecting an `OK` status line, returning the
    /// status payload if any.
    async fn command(&mut self, command: &str) -> Result<Option<String>> {
        let result = self.command_raw(command).await?;
        let mut parts = result.splitn(2, ' ');
        let status = parts.next().unwrap_or("");
        if status != "OK" {
            return Err(Error::Rejected {
                status: status.to_owned(),
            });
        }
        Ok(parts.next().map(str::to_owned))
    }

    /// Reads past blank lines (bounded by [`WAIT_COUNT`]) and compares the
    /// first non-blank line to the expected text.
    async fn expect(&mut self, text: &str) -> Result<()> {
        let mut line = String::new();
        for _ in 0..WAIT_COUNT {
            line = self.port.read_line().await?;
            if !line.is_empty() {
                break;
            }
        }

        if line != text {
            return Err(Error::EchoMismatch {
                expected: text.to_owned(),
                got: line,
            });
        }
        Ok(())
    }
}
