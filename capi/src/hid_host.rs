//! HID host profile.

use bt_topshim::btif::{BtStatus, RawAddress};
use bt_topshim::profiles::hid_host::{BthhConnectionState, HHCallbacks, HHCallbacksDispatcher};

use btif_macros::{btif_callback, btif_callbacks_dispatcher};

use log::{debug, warn};
use tokio::sync::mpsc::UnboundedSender;

use crate::bluetooth::Bluetooth;
use crate::callbacks::{deliver_callback, BtEventKind, BtResult, EventCallback};
use crate::converters::{convert_address_to_hex, convert_address_to_string};
use crate::error::{check_status, get_error_code, BtError};
use crate::Message;

pub fn get_hh_dispatcher(tx: UnboundedSender<Message>) -> HHCallbacksDispatcher {
    HHCallbacksDispatcher {
        dispatch: Box::new(move |cb| {
            if let Err(e) = tx.send(Message::HidHost(cb)) {
                debug!("Dispatch loop is gone, dropping {:?}", e.0);
            }
        }),
    }
}

impl Bluetooth {
    fn check_hid_init_status(&self) -> Result<(), BtError> {
        self.check_init_status()?;
        if !self.hid_initialized {
            warn!("HID host is not initialized");
            return Err(BtError::NotInitialized);
        }
        Ok(())
    }

    /// Starts the HID host profile. `callback` receives connection state changes with `true`
    /// for connected.
    pub fn hid_host_initialize<F>(&mut self, callback: F) -> Result<(), BtError>
    where
        F: FnMut(BtResult, bool, &str) + Send + 'static,
    {
        self.check_init_status()?;
        if self.hid_initialized {
            warn!("HID host already initialized");
            return Err(BtError::AlreadyDone);
        }

        let dispatcher = get_hh_dispatcher(self.tx());
        check_status("hid_host_initialize", self.intf.hid_init(dispatcher))?;
        self.callbacks.set(EventCallback::HidConnectionStateChanged(Box::new(callback)));
        self.hid_initialized = true;
        Ok(())
    }

    pub fn hid_host_deinitialize(&mut self) -> Result<(), BtError> {
        self.check_hid_init_status()?;

        let status = self.intf.hid_deinit();
        self.callbacks.unset(BtEventKind::HidConnectionStateChanged);
        self.hid_initialized = false;
        check_status("hid_host_deinitialize", status)
    }

    pub fn hid_host_connect(&mut self, remote_address: &str) -> Result<(), BtError> {
        self.check_hid_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("hid_host_connect", self.intf.hid_connect(&addr))
    }

    pub fn hid_host_disconnect(&mut self, remote_address: &str) -> Result<(), BtError> {
        self.check_hid_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("hid_host_disconnect", self.intf.hid_disconnect(&addr))
    }

    /// Converts a native HID host event and queues the invocation of the registered callback.
    pub fn handle_hid_host_callbacks(&mut self, cb: HHCallbacks) {
        dispatch_hid_callbacks(self, cb);
    }

    /// Delivers a native HID host event to the registered callback right away.
    pub fn dispatch_hid_host_callbacks(&mut self, cb: HHCallbacks) {
        self.handle_hid_host_callbacks(cb);
        self.run_pending_callbacks();
    }
}

#[btif_callbacks_dispatcher(dispatch_hid_callbacks, HHCallbacks)]
pub(crate) trait BtifHHCallbacks {
    #[btif_callback(ConnectionState)]
    fn connection_state(&mut self, status: BtStatus, addr: RawAddress, state: BthhConnectionState);
}

impl BtifHHCallbacks for Bluetooth {
    fn connection_state(&mut self, status: BtStatus, addr: RawAddress, state: BthhConnectionState) {
        let connected = match state {
            BthhConnectionState::Connected => true,
            BthhConnectionState::Disconnected => false,
            // Transient states are not reported.
            _ => {
                debug!("HID host {} is {:?}", addr, state);
                return;
            }
        };

        deliver_callback!(self, HidConnectionStateChanged, |cb| {
            cb(get_error_code(status), connected, &convert_address_to_string(&addr))
        });
    }
}
