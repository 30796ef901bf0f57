//! ECHONET Lite frame encoding and decoding.
//!
//! The wire format is fixed-width and big-endian throughout:
//! ```text
//! ┌────────┬────────┬───────────┬──────────────────────────────┐
//! │  EHD1  │  EHD2  │ TID (BE)  │  EDATA (format 1 only)       │
//! │ 1 byte │ 1 byte │  2 bytes  │  variable                    │
//! └────────┴────────┴───────────┴──────────────────────────────┘
//! ```
//! EDATA carries the source and destination object ids (3 bytes each),
//! the service code, a property count, and that many `(EPC, PDC[, EDT])`
//! entries. All functions here are pure; no I/O, no retained state.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::object::{Esv, object_id};

/// ECHONET Lite header magic (EHD1).
pub const EHD1_ECHONET: u8 = 0x10;

/// EHD2 value selecting the structured (decodable) EDATA format.
pub const EHD2_FORMAT1: u8 = 0x81;

/// EHD2 value selecting the free-form EDATA format.
pub const EHD2_FORMAT2: u8 = 0x82;

/// Minimum length of a decodable frame.
pub const MIN_FRAME_SIZE: usize = 10;

/// A decoded ECHONET Lite frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header magic byte (always [`EHD1_ECHONET`] after a successful parse).
    pub ehd1: u8,
    /// Format selector ([`EHD2_FORMAT1`] or [`EHD2_FORMAT2`]).
    pub ehd2: u8,
    /// Transaction id.
    pub tid: u16,
    /// Structured payload; present only for format-1 frames.
    pub edata: Option<EData>,
}

/// The structured payload of a format-1 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EData {
    /// Source object id (SEOJ).
    pub seoj: u32,
    /// Destination object id (DEOJ).
    pub deoj: u32,
    /// Service code (ESV).
    pub esv: u8,
    /// Property entries, in wire order.
    pub properties: Vec<Property>,
}

/// A single property entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property code (EPC).
    pub epc: u8,
    /// Declared value length in bytes (PDC).
    pub pdc: u8,
    /// Property value; `None` iff `pdc == 0`.
    pub edt: Option<Bytes>,
}

impl Property {
    /// A zero-length property, as used in read requests.
    #[must_use]
    pub const fn request(epc: u8) -> Self {
        Self {
            epc,
            pdc: 0,
            edt: None,
        }
    }

    /// A property carrying a value. PDC is derived from the value length.
    #[must_use]
    pub fn with_value(epc: u8, edt: impl Into<Bytes>) -> Self {
        let edt = edt.into();
        Self {
            epc,
            pdc: edt.len() as u8,
            edt: Some(edt),
        }
    }
}

/// Parses a complete frame.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] for anything shorter than
/// [`MIN_FRAME_SIZE`], and [`FrameError::BadHeader`] when EHD1 is not the
/// protocol magic or EHD2 is not one of the two known formats. EDATA is
/// decoded only for format-1 frames; format 2 leaves it absent.
pub fn parse_frame(packet: &[u8]) -> Result<Frame, FrameError> {
    if packet.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated {
            expected: MIN_FRAME_SIZE,
            got: packet.len(),
        });
    }

    let ehd1 = packet[0];
    let ehd2 = packet[1];
    if ehd1 != EHD1_ECHONET {
        return Err(FrameError::BadHeader { value: ehd1 });
    }
    if ehd2 != EHD2_FORMAT1 && ehd2 != EHD2_FORMAT2 {
        return Err(FrameError::BadHeader { value: ehd2 });
    }

    let tid = u16::from_be_bytes([packet[2], packet[3]]);
    let edata = if ehd2 == EHD2_FORMAT1 {
        Some(parse_edata(&packet[4..])?)
    } else {
        None
    };

    Ok(Frame {
        ehd1,
        ehd2,
        tid,
        edata,
    })
}

/// Parses the structured EDATA of a format-1 frame.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] if the fixed header is short or a
/// property's declared length overruns the buffer.
pub fn parse_edata(packet: &[u8]) -> Result<EData, FrameError> {
    if packet.len() < 8 {
        return Err(FrameError::Truncated {
            expected: 8,
            got: packet.len(),
        });
    }

    let seoj = object_id(packet[0], packet[1], packet[2]);
    let deoj = object_id(packet[3], packet[4], packet[5]);
    let esv = packet[6];
    let opc = packet[7];

    let mut rest = &packet[8..];
    let mut properties = Vec::with_capacity(usize::from(opc));
    for _ in 0..opc {
        if rest.len() < 2 {
            return Err(FrameError::Truncated {
                expected: 2,
                got: rest.len(),
            });
        }
        let epc = rest[0];
        let pdc = rest[1];
        rest = &rest[2..];

        let edt = if pdc == 0 {
            None
        } else {
            let len = usize::from(pdc);
            if rest.len() < len {
                return Err(FrameError::Truncated {
                    expected: len,
                    got: rest.len(),
                });
            }
            let value = Bytes::copy_from_slice(&rest[..len]);
            rest = &rest[len..];
            Some(value)
        };

        properties.push(Property { epc, pdc, edt });
    }

    Ok(EData {
        seoj,
        deoj,
        esv,
        properties,
    })
}

/// Encodes a format-1 frame around an already-encoded EDATA.
#[must_use]
pub fn build_frame(edata: &[u8], tid: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(4 + edata.len());
    buf.put_u8(EHD1_ECHONET);
    buf.put_u8(EHD2_FORMAT1);
    buf.put_u16(tid);
    buf.put_slice(edata);
    buf.freeze()
}

/// Encodes an EDATA block. The property count is taken from the slice
/// length; each entry's PDC is written as-is, so callers keep PDC
/// consistent with the value length (the [`Property`] constructors do).
#[must_use]
pub fn build_edata(seoj: u32, deoj: u32, esv: Esv, properties: &[Property]) -> Bytes {
    let mut buf = BytesMut::with_capacity(8 + properties.len() * 2);
    buf.put_slice(&seoj.to_be_bytes()[1..]);
    buf.put_slice(&deoj.to_be_bytes()[1..]);
    buf.put_u8(esv as u8);
    buf.put_u8(properties.len() as u8);
    for prop in properties {
        buf.put_slice(&build_property(prop.epc, prop.pdc, prop.edt.as_deref()));
    }
    buf.freeze()
}

/// Encodes a single `(EPC, PDC[, EDT])` entry.
#[must_use]
pub fn build_property(epc: u8, pdc: u8, edt: Option<&[u8]>) -> Bytes {
    let mut buf = BytesMut::with_capacity(2 + edt.map_or(0, <[u8]>::len));
    buf.put_u8(epc);
    buf.put_u8(pdc);
    match edt {
        Some(value) if pdc != 0 => buf.put_slice(value),
        _ => {}
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::object::{build_object_id, class, class_group};

    fn sample_edata() -> EData {
        EData {
            seoj: build_object_id(class_group::MANAGEMENT, class::CONTROLLER, 1),
            deoj: build_object_id(class_group::HOUSING, class::LOW_VOLTAGE_SMART_METER, 1),
            esv: Esv::PropRead as u8,
            properties: vec![Property::request(0xE7)],
        }
    }

    #[test]
    fn test_edata_round_trip() {
        let original = sample_edata();
        let encoded = build_edata(
            original.seoj,
            original.deoj,
            Esv::PropRead,
            &original.properties,
        );
        let decoded = parse_edata(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_frame_round_trip_keeps_tid() {
        let edata = build_edata(0x05FF01, 0x028801, Esv::PropRead, &[Property::request(0xE7)]);
        for tid in [0u16, 1, 0x1234, u16::MAX] {
            let frame = parse_frame(&build_frame(&edata, tid)).unwrap();
            assert_eq!(frame.tid, tid);
            assert_eq!(frame.ehd1, EHD1_ECHONET);
            assert_eq!(frame.ehd2, EHD2_FORMAT1);
            assert!(frame.edata.is_some());
        }
    }

    #[test]
    fn test_short_frame_is_truncated() {
        for len in 0..MIN_FRAME_SIZE {
            let packet = vec![0u8; len];
            assert_eq!(
                parse_frame(&packet),
                Err(FrameError::Truncated {
                    expected: MIN_FRAME_SIZE,
                    got: len,
                })
            );
        }
    }

    #[test]
    fn test_bad_ehd1_rejected_for_all_other_bytes() {
        let edata = build_edata(0x028801, 0x05FF01, Esv::PropRead, &[Property::request(0xE7)]);
        for value in 0u8..=255 {
            if value == EHD1_ECHONET {
                continue;
            }
            let mut packet = build_frame(&edata, 1).to_vec();
            packet[0] = value;
            assert_eq!(
                parse_frame(&packet),
                Err(FrameError::BadHeader { value }),
                "EHD1 0x{value:02x} must be rejected"
            );
        }
    }

    #[test]
    fn test_bad_ehd2_rejected() {
        let edata = build_edata(0x028801, 0x05FF01, Esv::PropRead, &[Property::request(0xE7)]);
        let mut packet = build_frame(&edata, 1).to_vec();
        packet[1] = 0x80;
        assert_eq!(parse_frame(&packet), Err(FrameError::BadHeader { value: 0x80 }));
    }

    #[test]
    fn test_format2_frame_has_no_edata() {
        let mut packet = vec![EHD1_ECHONET, EHD2_FORMAT2, 0x00, 0x07];
        packet.extend_from_slice(&[0xAA; 8]);
        let frame = parse_frame(&packet).unwrap();
        assert_eq!(frame.tid, 7);
        assert_eq!(frame.edata, None);
    }

    #[test]
    fn test_property_count_invariant() {
        for n in 0u8..8 {
            let properties: Vec<Property> = (0..n)
                .map(|i| Property::with_value(0xE0 + i, vec![i, i + 1, i + 2]))
                .collect();
            let encoded = build_edata(0x028801, 0x05FF01, Esv::PropWrite, &properties);
            let decoded = parse_edata(&encoded).unwrap();
            assert_eq!(decoded.properties.len(), usize::from(n));
            assert_eq!(decoded.properties, properties);
        }
    }

    #[test]
    fn test_zero_length_property_has_no_value() {
        let encoded = build_edata(0x028801, 0x05FF01, Esv::PropRead, &[Property::request(0x80)]);
        let decoded = parse_edata(&encoded).unwrap();
        assert_eq!(decoded.properties[0].pdc, 0);
        assert_eq!(decoded.properties[0].edt, None);
    }

    #[test]
    fn test_overrunning_pdc_is_truncated() {
        // One property declaring 4 bytes but carrying only 2.
        let packet = [
            0x02, 0x88, 0x01, // SEOJ
            0x05, 0xFF, 0x01, // DEOJ
            0x72, // ESV
            0x01, // OPC
            0xE7, 0x04, // EPC, PDC
            0x00, 0x01, // short EDT
        ];
        assert_eq!(
            parse_edata(&packet),
            Err(FrameError::Truncated { expected: 4, got: 2 })
        );
    }

    #[test]
    fn test_truncated_property_header() {
        // OPC says two properties; the second has no header bytes left.
        let packet = [
            0x02, 0x88, 0x01, 0x05, 0xFF, 0x01, 0x72, 0x02, // header, OPC=2
            0xE7, 0x00, // first property only
        ];
        assert_eq!(
            parse_edata(&packet),
            Err(FrameError::Truncated { expected: 2, got: 0 })
        );
    }
}
