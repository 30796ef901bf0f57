//! ECHONET Lite protocol definitions.
//!
//! This module contains the pure codec layer:
//! - Frame/EDATA/property encoding and decoding
//! - Object identifiers and well-known class/property codes

pub mod frame;
pub mod object;

/// UDP port used by ECHONET Lite.
pub const ECHONET_UDP_PORT: u16 = 3610;

pub use frame::{
    EData, EHD1_ECHONET, EHD2_FORMAT1, EHD2_FORMAT2, Frame, MIN_FRAME_SIZE, Property, build_edata,
    build_frame, build_property, parse_edata, parse_frame,
};
pub use object::{
    Esv, Instance, build_object_id, class, class_group, contains_class, epc, parse_instance_list,
};
