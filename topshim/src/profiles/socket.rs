use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use crate::btif::{BtStatus, RawAddress};

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq)]
#[repr(u32)]
/// Role of the local side of an RFCOMM connection.
pub enum BtSocketRole {
    /// Unknown role value.
    Unknown = 0,

    Server = 1,
    Client = 2,
}

impl From<u32> for BtSocketRole {
    fn from(item: u32) -> Self {
        BtSocketRole::from_u32(item).unwrap_or(BtSocketRole::Unknown)
    }
}

/// Payload of RFCOMM connected and disconnected events.
#[derive(Clone, Debug)]
pub struct BtRfcommConnection {
    pub socket_fd: i32,
    pub device_role: BtSocketRole,
    pub device_addr: RawAddress,
    pub uuid: String,
}

/// Data read from a connected RFCOMM socket.
#[derive(Clone, Debug)]
pub struct BtRfcommReceivedData {
    pub socket_fd: i32,
    pub buffer: Vec<u8>,
}

/// A remote device asking to connect to a listening server socket.
#[derive(Clone, Debug)]
pub struct BtRfcommConnectionRequest {
    pub socket_fd: i32,
    pub device_addr: RawAddress,
}

/// RFCOMM socket operations of the native library.
///
/// Connection outcomes and received data are delivered through the `BaseCallbacks` dispatcher
/// registered on the `BluetoothInterface`.
pub trait RfcommInterface {
    /// Creates a server socket for the service `uuid` and returns its fd.
    fn rfcomm_create_socket(&mut self, uuid: &str) -> Result<i32, BtStatus>;
    fn rfcomm_remove_socket(&mut self, socket_fd: i32) -> BtStatus;

    /// Listens and accepts every incoming connection without asking.
    fn rfcomm_listen_and_accept(&mut self, socket_fd: i32, max_pending: i32) -> BtStatus;
    /// Listens and reports incoming connections as `RfcommConnectionRequested`.
    fn rfcomm_listen(&mut self, socket_fd: i32, max_pending: i32) -> BtStatus;
    fn rfcomm_accept_connection(&mut self, socket_fd: i32) -> BtStatus;
    fn rfcomm_reject_connection(&mut self, socket_fd: i32) -> BtStatus;

    fn rfcomm_connect(&mut self, addr: &RawAddress, uuid: &str) -> BtStatus;
    fn rfcomm_disconnect(&mut self, socket_fd: i32) -> BtStatus;

    /// Writes `data` and returns the number of bytes written.
    fn rfcomm_write(&mut self, socket_fd: i32, data: &[u8]) -> Result<usize, BtStatus>;
}
