//! ECHONET object identifiers and the well-known codes used by this crate.
//!
//! An object id (EOJ) is a 24-bit `(class group, class, instance)` triplet,
//! transmitted as 3 bytes and carried here in the low 3 bytes of a `u32`.

use crate::error::FrameError;

/// Class group codes.
pub mod class_group {
    /// Housing / facility device class group.
    pub const HOUSING: u8 = 0x02;
    /// Management / operation device class group.
    pub const MANAGEMENT: u8 = 0x05;
}

/// Class codes within the groups above.
pub mod class {
    /// Low-voltage smart electric energy meter (housing group).
    pub const LOW_VOLTAGE_SMART_METER: u8 = 0x88;
    /// Controller (management group).
    pub const CONTROLLER: u8 = 0xFF;
}

/// Property codes of the low-voltage smart meter class.
pub mod epc {
    /// Operating status.
    pub const STATUS: u8 = 0x80;
    /// Number of effective digits of cumulative energy.
    pub const CUMULATIVE_ENERGY_DIGITS: u8 = 0xD7;
    /// Cumulative energy, normal direction.
    pub const CUMULATIVE_ENERGY_NORMAL: u8 = 0xE0;
    /// Cumulative energy unit.
    pub const CUMULATIVE_ENERGY_UNIT: u8 = 0xE1;
    /// Cumulative energy, reverse direction.
    pub const CUMULATIVE_ENERGY_REVERSE: u8 = 0xE3;
    /// Instantaneous power in watts.
    pub const INSTANTANEOUS_POWER: u8 = 0xE7;
    /// Instantaneous current.
    pub const INSTANTANEOUS_CURRENT: u8 = 0xE8;
    /// Cumulative energy at fixed time, normal direction.
    pub const CUMULATIVE_ENERGY_FIXED_NORMAL: u8 = 0xEA;
    /// Cumulative energy at fixed time, reverse direction.
    pub const CUMULATIVE_ENERGY_FIXED_REVERSE: u8 = 0xEB;
}

/// Service codes (ESV).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Esv {
    /// Property write request, no response required.
    PropWriteNoRes = 0x60,
    /// Property write request.
    PropWrite = 0x61,
    /// Property read request.
    PropRead = 0x62,
    /// Property write-and-read request.
    PropWriteRead = 0x6E,
    /// Property write response.
    PropWriteRes = 0x71,
    /// Property read response.
    PropReadRes = 0x72,
    /// Property notification.
    PropNotify = 0x73,
}

/// Packs a `(class group, class, instance)` triplet into an object id.
#[must_use]
pub const fn build_object_id(class_group: u8, class: u8, instance: u8) -> u32 {
    ((class_group as u32) << 16) | ((class as u32) << 8) | instance as u32
}

/// Reassembles an object id from its 3 wire bytes.
#[must_use]
pub const fn object_id(class_group: u8, class: u8, instance: u8) -> u32 {
    build_object_id(class_group, class, instance)
}

/// One entry of a self-node instance list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instance {
    pub class_group: u8,
    pub class: u8,
    pub instance: u8,
}

/// Parses an instance-list property value: a count byte followed by that
/// many 3-byte `(class group, class, instance)` entries.
///
/// # Errors
///
/// Returns [`FrameError::Truncated`] when the buffer ends before the
/// declared count is satisfied.
pub fn parse_instance_list(packet: &[u8]) -> Result<Vec<Instance>, FrameError> {
    let Some((&count, mut rest)) = packet.split_first() else {
        return Err(FrameError::Truncated {
            expected: 1,
            got: 0,
        });
    };

    let mut instances = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        if rest.len() < 3 {
            return Err(FrameError::Truncated {
                expected: 3,
                got: rest.len(),
            });
        }
        instances.push(Instance {
            class_group: rest[0],
            class: rest[1],
            instance: rest[2],
        });
        rest = &rest[3..];
    }

    Ok(instances)
}

/// Returns true if any instance belongs to the given class.
///
/// Intended for validating that a discovered node actually exposes the
/// expected meter class.
#[must_use]
pub fn contains_class(instances: &[Instance], class_group: u8, class: u8) -> bool {
    instances
        .iter()
        .any(|inst| inst.class_group == class_group && inst.class == class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_packing() {
        assert_eq!(
            build_object_id(class_group::HOUSING, class::LOW_VOLTAGE_SMART_METER, 1),
            0x0002_8801
        );
        assert_eq!(
            build_object_id(class_group::MANAGEMENT, class::CONTROLLER, 1),
            0x0005_FF01
        );
    }

    #[test]
    fn test_object_id_round_trip_over_byte_ranges() {
        for group in [0x00u8, 0x02, 0x05, 0x7F, 0xFF] {
            for class in [0x00u8, 0x88, 0xFF] {
                for instance in [0x01u8, 0x7F, 0xFF] {
                    let id = build_object_id(group, class, instance);
                    let bytes = id.to_be_bytes();
                    assert_eq!(bytes[0], 0);
                    assert_eq!(object_id(bytes[1], bytes[2], bytes[3]), id);
                    assert_eq!((bytes[1], bytes[2], bytes[3]), (group, class, instance));
                }
            }
        }
    }

    #[test]
    fn test_parse_instance_list() {
        let packet = [0x02, 0x02, 0x88, 0x01, 0x0E, 0xF0, 0x01];
        let instances = parse_instance_list(&packet).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(
            instances[0],
            Instance {
                class_group: 0x02,
                class: 0x88,
                instance: 0x01,
            }
        );
    }

    #[test]
    fn test_parse_instance_list_truncated() {
        let packet = [0x02, 0x02, 0x88, 0x01, 0x0E];
        assert_eq!(
            parse_instance_list(&packet),
            Err(FrameError::Truncated { expected: 3, got: 2 })
        );
    }

    #[test]
    fn test_contains_class() {
        let instances = parse_instance_list(&[0x01, 0x02, 0x88, 0x01]).unwrap();
        assert!(contains_class(
            &instances,
            class_group::HOUSING,
            class::LOW_VOLTAGE_SMART_METER
        ));
        assert!(!contains_class(
            &instances,
            class_group::MANAGEMENT,
            class::CONTROLLER
        ));
    }
}
