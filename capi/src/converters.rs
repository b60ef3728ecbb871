//! Conversion of native stack records into the public payload types.
//!
//! Every payload is an owned value lent to a callback and dropped when the callback returns, so a
//! conversion that fails halfway releases whatever it already built.

use std::convert::TryFrom;

use bt_topshim::btif::{ascii_to_string, BtDeviceClass, BtDeviceInfo, BtSdpInfo, RawAddress};
use bt_topshim::profiles::socket::{BtRfcommConnection, BtRfcommReceivedData, BtSocketRole};
use log::error;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use crate::error::BtError;

/// Formats an address as "XX:XX:XX:XX:XX:XX".
pub fn convert_address_to_string(addr: &RawAddress) -> String {
    addr.to_string()
}

/// Parses "XX:XX:XX:XX:XX:XX" (case insensitive) into an address.
pub fn convert_address_to_hex(addr: &str) -> Result<RawAddress, BtError> {
    RawAddress::from_string(addr).ok_or_else(|| {
        error!("Malformed address string: {:?}", addr);
        BtError::InvalidParameter
    })
}

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtMajorDeviceClass {
    Misc = 0x00,
    Computer = 0x01,
    Phone = 0x02,
    LanNetworkAccessPoint = 0x03,
    AudioVideo = 0x04,
    Peripheral = 0x05,
    Imaging = 0x06,
    Wearable = 0x07,
    Toy = 0x08,
    Health = 0x09,
    Uncategorized = 0x1f,
}

impl From<u32> for BtMajorDeviceClass {
    fn from(item: u32) -> Self {
        BtMajorDeviceClass::from_u32(item).unwrap_or(BtMajorDeviceClass::Uncategorized)
    }
}

/// Class of a remote device.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceClass {
    pub major_device_class: BtMajorDeviceClass,
    /// Minor class bits as they appear in the class of device (bits 2..7).
    pub minor_device_class: u32,
    /// Major service class bits as they appear in the class of device (bits 13..23).
    pub major_service_class_mask: u32,
}

impl From<&BtDeviceClass> for DeviceClass {
    fn from(item: &BtDeviceClass) -> Self {
        DeviceClass {
            major_device_class: BtMajorDeviceClass::from(item.major_class),
            minor_device_class: item.minor_class,
            major_service_class_mask: item.service_class,
        }
    }
}

/// A bonded or newly bonded remote device.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInfo {
    pub remote_address: String,
    pub remote_name: Option<String>,
    pub bt_class: DeviceClass,
    pub service_uuids: Vec<String>,
    pub is_bonded: bool,
    pub is_connected: bool,
    pub is_authorized: bool,
    pub manufacturer_data: Vec<u8>,
}

impl DeviceInfo {
    pub fn service_count(&self) -> usize {
        self.service_uuids.len()
    }
}

/// A remote device reported while discovery runs.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryInfo {
    pub remote_address: String,
    pub remote_name: Option<String>,
    pub bt_class: DeviceClass,
    pub rssi: i32,
    pub is_bonded: bool,
    pub service_uuids: Vec<String>,
    pub manufacturer_data: Vec<u8>,
}

impl DiscoveryInfo {
    pub fn service_count(&self) -> usize {
        self.service_uuids.len()
    }
}

/// Services found by a service search.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceSdpInfo {
    pub remote_address: String,
    pub service_uuids: Vec<String>,
}

impl DeviceSdpInfo {
    pub fn service_count(&self) -> usize {
        self.service_uuids.len()
    }
}

/// An RFCOMM connection that was established or torn down.
#[derive(Clone, Debug, PartialEq)]
pub struct SocketConnection {
    pub socket_fd: i32,
    pub local_role: BtSocketRole,
    pub remote_address: String,
    pub service_uuid: String,
}

impl From<&BtRfcommConnection> for SocketConnection {
    fn from(item: &BtRfcommConnection) -> Self {
        SocketConnection {
            socket_fd: item.socket_fd,
            local_role: item.device_role,
            remote_address: convert_address_to_string(&item.device_addr),
            service_uuid: item.uuid.clone(),
        }
    }
}

/// Data received on an RFCOMM socket.
#[derive(Clone, Debug, PartialEq)]
pub struct SocketReceivedData {
    pub socket_fd: i32,
    pub data: Vec<u8>,
}

impl From<BtRfcommReceivedData> for SocketReceivedData {
    fn from(item: BtRfcommReceivedData) -> Self {
        SocketReceivedData { socket_fd: item.socket_fd, data: item.buffer }
    }
}

/// Copies the first `count` UUIDs, uppercased.
///
/// Fails if the native record claims more services than it carries.
fn convert_uuids(
    addr: &RawAddress,
    count: usize,
    uuids: &[String],
) -> Result<Vec<String>, BtError> {
    if count > uuids.len() {
        error!("{}: service count {} but only {} uuids", addr, count, uuids.len());
        return Err(BtError::OperationFailed);
    }

    Ok(uuids[..count].iter().map(|uuid| uuid.to_uppercase()).collect())
}

/// Decodes the padded name; an empty name becomes None.
fn convert_name(name: &[u8]) -> Option<String> {
    Some(ascii_to_string(name)).filter(|name| !name.is_empty())
}

impl TryFrom<&BtDeviceInfo> for DeviceInfo {
    type Error = BtError;

    fn try_from(item: &BtDeviceInfo) -> Result<Self, Self::Error> {
        Ok(DeviceInfo {
            remote_address: convert_address_to_string(&item.addr),
            remote_name: convert_name(&item.name),
            bt_class: DeviceClass::from(&item.class),
            service_uuids: convert_uuids(&item.addr, item.service_index, &item.uuids)?,
            is_bonded: item.paired,
            is_connected: item.connected,
            is_authorized: item.trust,
            manufacturer_data: item.manufacturer_data.clone(),
        })
    }
}

impl TryFrom<&BtDeviceInfo> for DiscoveryInfo {
    type Error = BtError;

    fn try_from(item: &BtDeviceInfo) -> Result<Self, Self::Error> {
        Ok(DiscoveryInfo {
            remote_address: convert_address_to_string(&item.addr),
            remote_name: convert_name(&item.name),
            bt_class: DeviceClass::from(&item.class),
            rssi: i32::from(item.rssi),
            is_bonded: item.paired,
            service_uuids: convert_uuids(&item.addr, item.service_index, &item.uuids)?,
            manufacturer_data: item.manufacturer_data.clone(),
        })
    }
}

impl TryFrom<&BtSdpInfo> for DeviceSdpInfo {
    type Error = BtError;

    fn try_from(item: &BtSdpInfo) -> Result<Self, Self::Error> {
        Ok(DeviceSdpInfo {
            remote_address: convert_address_to_string(&item.device_addr),
            service_uuids: convert_uuids(&item.device_addr, item.service_index, &item.uuids)?,
        })
    }
}
