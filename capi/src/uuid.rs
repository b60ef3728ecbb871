//! Service class masks derived from profile UUIDs.

use bitflags::bitflags;
use log::debug;

bitflags! {
    /// Service classes a remote device advertises, as reported by the platform C API.
    pub struct BtServiceClass: u32 {
        const RES = 0x0000_0001;
        const SPP = 0x0000_0002;
        const DUN = 0x0000_0004;
        const FAX = 0x0000_0008;
        const LAP = 0x0000_0010;
        const HSP = 0x0000_0020;
        const HFP = 0x0000_0040;
        const OPP = 0x0000_0080;
        const FTP = 0x0000_0100;
        const CTP = 0x0000_0200;
        const ICP = 0x0000_0400;
        const SYNC = 0x0000_0800;
        const BPP = 0x0000_1000;
        const BIP = 0x0000_2000;
        const PANU = 0x0000_4000;
        const NAP = 0x0000_8000;
        const GN = 0x0001_0000;
        const SAP = 0x0002_0000;
        const A2DP = 0x0004_0000;
        const AVRCP = 0x0008_0000;
        const PBAP = 0x0010_0000;
        const HID = 0x0020_0000;
        const A2DP_SOURCE = 0x0040_0000;
    }
}

pub const SPP: &str = "00001101-0000-1000-8000-00805F9B34FB";
pub const OBEX_OBJECT_PUSH: &str = "00001105-0000-1000-8000-00805F9B34FB";
pub const HID: &str = "00001124-0000-1000-8000-00805F9B34FB";
pub const A2DP_SOURCE: &str = "0000110A-0000-1000-8000-00805F9B34FB";
pub const A2DP_SINK: &str = "0000110B-0000-1000-8000-00805F9B34FB";
pub const HFP_AG: &str = "0000111F-0000-1000-8000-00805F9B34FB";

/// Maps a 16-bit service class identifier to its mask bit.
fn service_class_from_short(short: u16) -> BtServiceClass {
    match short {
        0x1101 => BtServiceClass::SPP,
        0x1102 => BtServiceClass::LAP,
        0x1103 => BtServiceClass::DUN,
        0x1104 => BtServiceClass::SYNC,
        0x1105 => BtServiceClass::OPP,
        0x1106 => BtServiceClass::FTP,
        0x1108 | 0x1112 => BtServiceClass::HSP,
        0x1109 => BtServiceClass::CTP,
        0x110A => BtServiceClass::A2DP_SOURCE,
        0x110B | 0x110D => BtServiceClass::A2DP,
        0x110C | 0x110E | 0x110F => BtServiceClass::AVRCP,
        0x1110 => BtServiceClass::ICP,
        0x1111 => BtServiceClass::FAX,
        0x1115 => BtServiceClass::PANU,
        0x1116 => BtServiceClass::NAP,
        0x1117 => BtServiceClass::GN,
        0x111A => BtServiceClass::BIP,
        0x111E | 0x111F => BtServiceClass::HFP,
        0x1122 => BtServiceClass::BPP,
        0x1124 => BtServiceClass::HID,
        0x112D => BtServiceClass::SAP,
        0x112F | 0x1130 => BtServiceClass::PBAP,
        _ => BtServiceClass::empty(),
    }
}

/// Extracts the 16-bit short form of a UUID string.
///
/// Full UUIDs carry it in the low half of their first group; short UUIDs are the whole string.
fn short_uuid(uuid: &str) -> Option<u16> {
    let head = uuid.split('-').next()?;
    let value = u32::from_str_radix(head, 16).ok()?;
    Some((value & 0xffff) as u16)
}

/// Folds the service classes named by `uuids` into one mask.
///
/// UUIDs that cannot be parsed or name no known service class contribute nothing.
pub fn get_service_mask_from_uuid_list(uuids: &[String]) -> BtServiceClass {
    uuids.iter().fold(BtServiceClass::empty(), |mask, uuid| match short_uuid(uuid) {
        Some(short) => mask | service_class_from_short(short),
        None => {
            debug!("Skipping unparseable uuid {:?}", uuid);
            mask
        }
    })
}
