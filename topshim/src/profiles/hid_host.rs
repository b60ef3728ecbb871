use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::cast::FromPrimitive;

use crate::btif::{BtStatus, RawAddress};

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum BthhConnectionState {
    Connected = 0,
    Connecting,
    Disconnected,
    Disconnecting,
    Unknown = 0xff,
}

impl From<u32> for BthhConnectionState {
    fn from(item: u32) -> Self {
        BthhConnectionState::from_u32(item).unwrap_or(BthhConnectionState::Unknown)
    }
}

#[derive(Debug)]
pub enum HHCallbacks {
    ConnectionState(BtStatus, RawAddress, BthhConnectionState),
}

pub struct HHCallbacksDispatcher {
    pub dispatch: Box<dyn Fn(HHCallbacks) + Send>,
}

/// HID host operations of the native library.
pub trait HidHostInterface {
    /// Installs the dispatcher receiving `HHCallbacks` events.
    fn hid_init(&mut self, dispatcher: HHCallbacksDispatcher) -> BtStatus;
    fn hid_deinit(&mut self) -> BtStatus;
    fn hid_connect(&mut self, addr: &RawAddress) -> BtStatus;
    fn hid_disconnect(&mut self, addr: &RawAddress) -> BtStatus;
}
