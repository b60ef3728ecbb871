//! Provides the registry of user callbacks, one slot per event kind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::bluetooth::{
    BtAdapterDeviceDiscoveryState, BtAdapterState, BtAdapterVisibilityMode, BtDeviceAuthorization,
};
use crate::converters::{
    DeviceInfo, DeviceSdpInfo, DiscoveryInfo, SocketConnection, SocketReceivedData,
};
use crate::error::BtError;
use crate::socket::BtSocketConnectionState;

/// Result passed to callbacks of asynchronous operations. `Ok(())` stands for success.
pub type BtResult = Result<(), BtError>;

/// A callback invocation prepared while handling an event, run once the context is unlocked.
pub type PendingCallback = Box<dyn FnOnce() + Send>;

/// Kinds of events a callback can be registered for.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum BtEventKind {
    AdapterStateChanged,
    AdapterNameChanged,
    AdapterVisibilityModeChanged,
    AdapterDeviceDiscoveryStateChanged,
    DeviceBondCreated,
    DeviceBondDestroyed,
    DeviceAuthorizationChanged,
    DeviceServiceSearched,
    DeviceConnectionStateChanged,
    SocketDataReceived,
    SocketConnectionStateChanged,
    SocketConnectionRequested,
    HidConnectionStateChanged,
}

/// A registered callback. Whatever the caller needs back (its "user data") is captured by the
/// closure.
pub enum EventCallback {
    AdapterStateChanged(Box<dyn FnMut(BtResult, BtAdapterState) + Send>),
    AdapterNameChanged(Box<dyn FnMut(&str) + Send>),
    AdapterVisibilityModeChanged(Box<dyn FnMut(BtResult, BtAdapterVisibilityMode) + Send>),
    AdapterDeviceDiscoveryStateChanged(
        Box<dyn FnMut(BtResult, BtAdapterDeviceDiscoveryState, Option<&DiscoveryInfo>) + Send>,
    ),
    DeviceBondCreated(Box<dyn FnMut(BtResult, Option<&DeviceInfo>) + Send>),
    DeviceBondDestroyed(Box<dyn FnMut(BtResult, &str) + Send>),
    DeviceAuthorizationChanged(Box<dyn FnMut(BtDeviceAuthorization, &str) + Send>),
    DeviceServiceSearched(Box<dyn FnMut(BtResult, Option<&DeviceSdpInfo>) + Send>),
    DeviceConnectionStateChanged(Box<dyn FnMut(bool, &str) + Send>),
    SocketDataReceived(Box<dyn FnMut(&SocketReceivedData) + Send>),
    SocketConnectionStateChanged(
        Box<dyn FnMut(BtResult, BtSocketConnectionState, Option<&SocketConnection>) + Send>,
    ),
    SocketConnectionRequested(Box<dyn FnMut(i32, &str) + Send>),
    HidConnectionStateChanged(Box<dyn FnMut(BtResult, bool, &str) + Send>),
}

impl EventCallback {
    pub fn kind(&self) -> BtEventKind {
        match self {
            EventCallback::AdapterStateChanged(_) => BtEventKind::AdapterStateChanged,
            EventCallback::AdapterNameChanged(_) => BtEventKind::AdapterNameChanged,
            EventCallback::AdapterVisibilityModeChanged(_) => {
                BtEventKind::AdapterVisibilityModeChanged
            }
            EventCallback::AdapterDeviceDiscoveryStateChanged(_) => {
                BtEventKind::AdapterDeviceDiscoveryStateChanged
            }
            EventCallback::DeviceBondCreated(_) => BtEventKind::DeviceBondCreated,
            EventCallback::DeviceBondDestroyed(_) => BtEventKind::DeviceBondDestroyed,
            EventCallback::DeviceAuthorizationChanged(_) => BtEventKind::DeviceAuthorizationChanged,
            EventCallback::DeviceServiceSearched(_) => BtEventKind::DeviceServiceSearched,
            EventCallback::DeviceConnectionStateChanged(_) => {
                BtEventKind::DeviceConnectionStateChanged
            }
            EventCallback::SocketDataReceived(_) => BtEventKind::SocketDataReceived,
            EventCallback::SocketConnectionStateChanged(_) => {
                BtEventKind::SocketConnectionStateChanged
            }
            EventCallback::SocketConnectionRequested(_) => BtEventKind::SocketConnectionRequested,
            EventCallback::HidConnectionStateChanged(_) => BtEventKind::HidConnectionStateChanged,
        }
    }
}

/// Holds at most one callback per event kind; the last registration wins.
///
/// A slot is shared with the deliveries already queued for it, so replacing or unsetting it
/// from inside a callback does not disturb the call in progress.
pub struct Callbacks {
    slots: HashMap<BtEventKind, Arc<Mutex<EventCallback>>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self { slots: HashMap::new() }
    }

    /// Stores the callback in the slot of its kind, replacing any previous one.
    pub fn set(&mut self, callback: EventCallback) {
        self.slots.insert(callback.kind(), Arc::new(Mutex::new(callback)));
    }

    /// Empties the slot of `kind`. Does nothing if it is already empty.
    pub fn unset(&mut self, kind: BtEventKind) {
        self.slots.remove(&kind);
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn is_set(&self, kind: BtEventKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Returns the callback registered for `kind`.
    pub fn get(&self, kind: BtEventKind) -> Option<Arc<Mutex<EventCallback>>> {
        self.slots.get(&kind).cloned()
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates the public set/unset pair of each listed slot on `Bluetooth`.
///
/// Both fail with `NotInitialized` before `Bluetooth::initialize`.
macro_rules! callback_slot_accessors {
    ($($kind:ident => $set:ident, $unset:ident, FnMut($($arg:ty),*);)*) => {
        impl $crate::bluetooth::Bluetooth {
            $(
                pub fn $set<F>(&mut self, callback: F) -> Result<(), $crate::error::BtError>
                where
                    F: FnMut($($arg),*) + Send + 'static,
                {
                    self.check_init_status()?;
                    self.callbacks.set($crate::callbacks::EventCallback::$kind(Box::new(callback)));
                    Ok(())
                }

                pub fn $unset(&mut self) -> Result<(), $crate::error::BtError> {
                    self.check_init_status()?;
                    self.callbacks.unset($crate::callbacks::BtEventKind::$kind);
                    Ok(())
                }
            )*
        }
    };
}

/// Queues `$body` on `$bt` with `$cb` bound to the closure registered for `$kind`.
///
/// Nothing is queued, and `$body` never runs, when the slot is empty. `$body` runs once the
/// context is unlocked, so it must only capture owned values.
macro_rules! deliver_callback {
    ($bt:expr, $kind:ident, |$cb:ident| $body:expr) => {
        if let Some(slot) = $bt.callbacks.get($crate::callbacks::BtEventKind::$kind) {
            $bt.defer(move || match slot.lock() {
                Ok(mut callback) => {
                    if let $crate::callbacks::EventCallback::$kind($cb) = &mut *callback {
                        $body;
                    }
                }
                Err(_) => {
                    log::error!("{:?} callback poisoned", $crate::callbacks::BtEventKind::$kind)
                }
            });
        }
    };
}

pub(crate) use callback_slot_accessors;
pub(crate) use deliver_callback;
