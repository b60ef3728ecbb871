//! Bluetooth interface shim
//!
//! Types mirroring the native Bluetooth library (result codes, addresses, device records) and the
//! trait a platform integration implements to expose that library to the API layer.

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;
use std::convert::TryInto;
use std::fmt::{Debug, Display, Formatter, Result};

use crate::profiles::socket::{BtRfcommConnection, BtRfcommConnectionRequest, BtRfcommReceivedData};

/// Result codes of the native library.
#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BtStatus {
    Success = 0,
    Cancel = -0x01,
    InvalidCallback = -0x02,
    InvalidParam = -0x03,
    InvalidData = -0x04,
    MemoryAllocation = -0x05,
    OutOfMemory = -0x06,
    Timeout = -0x07,
    NoResources = -0x08,
    Internal = -0x09,
    NotSupport = -0x0a,
    DeviceNotEnabled = -0x0b,
    DeviceAlreadyEnabled = -0x0c,
    DeviceBusy = -0x0d,
    AccessDenied = -0x0e,
    MaxClient = -0x0f,
    NotFound = -0x10,
    ServiceSearchError = -0x11,
    PairingFailed = -0x12,
    NotPaired = -0x13,
    ServiceNotFound = -0x14,
    NotConnected = -0x15,
    AlreadyConnect = -0x16,
    ConnectionBusy = -0x17,
    ConnectionError = -0x18,
    MaxConnection = -0x19,
    NotInOperation = -0x1a,
    CancelByUser = -0x1b,
    RegistrationFailed = -0x1c,
    InProgress = -0x1d,
    AuthenticationFailed = -0x1e,
    HostDown = -0x1f,
    EndOfDeviceList = -0x20,
    AgentAlreadyExist = -0x21,
    AgentDoesNotExist = -0x22,
    AlreadyInitialized = -0x23,
    PermissionDenied = -0x24,
    AlreadyDeactivated = -0x25,
    NotInitialized = -0x26,
    AuthenticationRejected = -0x27,
    AuthorizationRejected = -0x28,
    NoData = -0x29,
    Again = -0x2a,

    // Any statuses that couldn't be cleanly converted
    Unknown = -0xff,
}

impl From<i32> for BtStatus {
    fn from(item: i32) -> Self {
        BtStatus::from_i32(item).unwrap_or(BtStatus::Unknown)
    }
}

/// Power state of the local adapter as reported by the native library.
#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum BtState {
    Off = 0,
    On,
}

impl From<u32> for BtState {
    fn from(item: u32) -> Self {
        BtState::from_u32(item).unwrap_or(BtState::Off)
    }
}

/// Discoverable (scan) mode of the local adapter.
#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum BtDiscoverableMode {
    /// Connectable but not discoverable.
    Connectable = 0,
    GeneralDiscoverable,
    TimeLimitedDiscoverable,
}

impl From<u32> for BtDiscoverableMode {
    fn from(item: u32) -> Self {
        BtDiscoverableMode::from_u32(item).unwrap_or(BtDiscoverableMode::Connectable)
    }
}

/// A Bluetooth device address, most significant byte first.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct RawAddress {
    pub address: [u8; 6],
}

impl Debug for RawAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        Display::fmt(self, f)
    }
}

impl Display for RawAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let a = &self.address;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

impl RawAddress {
    /// Constructs a RawAddress from a slice of exactly 6 bytes.
    pub fn from_bytes(raw_addr: &[u8]) -> Option<RawAddress> {
        match raw_addr.try_into() {
            Ok(address) => Some(RawAddress { address }),
            Err(_) => None,
        }
    }

    /// Parses "XX:XX:XX:XX:XX:XX", case insensitive.
    pub fn from_string<S: Into<String>>(addr: S) -> Option<RawAddress> {
        let addr: String = addr.into();
        let s = addr.split(':').collect::<Vec<&str>>();

        if s.len() != 6 {
            return None;
        }

        let mut raw: [u8; 6] = [0; 6];
        for (i, octet) in s.iter().enumerate() {
            if octet.len() != 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            raw[i] = match u8::from_str_radix(octet, 16) {
                Ok(res) => res,
                Err(_) => {
                    return None;
                }
            };
        }

        Some(RawAddress { address: raw })
    }

    pub fn to_byte_arr(&self) -> [u8; 6] {
        self.address
    }
}

/// Class of device split in the fields the native library reports.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BtDeviceClass {
    pub major_class: u32,
    pub minor_class: u32,
    pub service_class: u32,
}

impl From<u32> for BtDeviceClass {
    /// Decodes a raw 24-bit class of device.
    fn from(cod: u32) -> Self {
        BtDeviceClass {
            major_class: (cod & 0x1f00) >> 8,
            minor_class: cod & 0xfc,
            service_class: cod & 0xffe000,
        }
    }
}

/// Device record as produced by discovery, bonding and the bonded device list.
#[derive(Clone, Debug, Default)]
pub struct BtDeviceInfo {
    pub addr: RawAddress,
    /// Raw, NUL padded name bytes.
    pub name: Vec<u8>,
    pub class: BtDeviceClass,
    pub rssi: i16,
    pub paired: bool,
    pub connected: bool,
    pub trust: bool,
    /// Number of valid entries in `uuids`, as reported by the library.
    pub service_index: usize,
    pub uuids: Vec<String>,
    pub manufacturer_data: Vec<u8>,
}

/// Result of a service search on a remote device.
#[derive(Clone, Debug, Default)]
pub struct BtSdpInfo {
    pub device_addr: RawAddress,
    pub service_index: usize,
    pub uuids: Vec<String>,
}

/// Converts NUL padded bytes into a String, stopping at the first NUL.
///
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn ascii_to_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Events emitted by the native library after registering through
/// `BluetoothInterface::register_callback`.
#[derive(Debug)]
pub enum BaseCallbacks {
    AdapterEnabled(BtStatus),
    AdapterDisabled(BtStatus),
    LocalNameChanged(BtStatus, String),
    DiscoverableModeChanged(BtStatus, BtDiscoverableMode),
    DiscoveryStarted(BtStatus),
    DiscoveryFinished(BtStatus),
    RemoteDeviceFound(BtStatus, BtDeviceInfo),
    BondingFinished(BtStatus, BtDeviceInfo),
    BondedDeviceRemoved(BtStatus, RawAddress),
    DeviceAuthorized(BtStatus, RawAddress),
    DeviceUnauthorized(BtStatus, RawAddress),
    ServiceSearched(BtStatus, BtSdpInfo),
    DeviceConnected(BtStatus, RawAddress),
    DeviceDisconnected(BtStatus, RawAddress),
    RfcommDataReceived(BtStatus, BtRfcommReceivedData),
    RfcommConnected(BtStatus, BtRfcommConnection),
    RfcommDisconnected(BtStatus, BtRfcommConnection),
    RfcommConnectionRequested(BtStatus, BtRfcommConnectionRequest),
}

pub struct BaseCallbacksDispatcher {
    pub dispatch: Box<dyn Fn(BaseCallbacks) + Send>,
}

/// Adapter and device operations of the native library.
///
/// Commands return the status of the request only; their outcome arrives later as a
/// `BaseCallbacks` event. Getters answer synchronously.
pub trait BluetoothInterface {
    /// Installs the dispatcher receiving every `BaseCallbacks` event.
    fn register_callback(&mut self, dispatcher: BaseCallbacksDispatcher) -> BtStatus;
    fn unregister_callback(&mut self) -> BtStatus;

    fn enable_adapter(&mut self) -> BtStatus;
    fn disable_adapter(&mut self) -> BtStatus;
    fn check_adapter(&self) -> BtState;

    fn get_local_address(&self) -> std::result::Result<RawAddress, BtStatus>;
    fn get_local_name(&self) -> std::result::Result<String, BtStatus>;
    fn set_local_name(&mut self, name: &str) -> BtStatus;

    fn get_discoverable_mode(&self) -> std::result::Result<BtDiscoverableMode, BtStatus>;
    /// Remaining seconds of a time limited discoverable mode.
    fn get_discoverable_timeout(&self) -> std::result::Result<i32, BtStatus>;
    fn set_discoverable_mode(&mut self, mode: BtDiscoverableMode, timeout: i32) -> BtStatus;

    fn start_discovery(&mut self) -> BtStatus;
    fn cancel_discovery(&mut self) -> BtStatus;
    fn is_discovering(&self) -> std::result::Result<bool, BtStatus>;

    fn get_bonded_device_list(&self) -> std::result::Result<Vec<BtDeviceInfo>, BtStatus>;
    fn get_bonded_device(&self, addr: &RawAddress) -> std::result::Result<BtDeviceInfo, BtStatus>;
    fn is_service_used(&self, uuid: &str) -> std::result::Result<bool, BtStatus>;

    fn bond_device(&mut self, addr: &RawAddress) -> BtStatus;
    fn cancel_bonding(&mut self) -> BtStatus;
    fn unbond_device(&mut self, addr: &RawAddress) -> BtStatus;
    fn set_alias(&mut self, addr: &RawAddress, alias: &str) -> BtStatus;
    fn authorize_device(&mut self, addr: &RawAddress, authorized: bool) -> BtStatus;
    fn search_service(&mut self, addr: &RawAddress) -> BtStatus;
    fn cancel_service_search(&mut self) -> BtStatus;
}
