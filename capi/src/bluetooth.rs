//! Anything related to the adapter and remote devices.

use std::convert::TryFrom;

use bt_topshim::btif::{
    BaseCallbacks, BaseCallbacksDispatcher, BtDeviceInfo, BtDiscoverableMode, BtSdpInfo, BtState,
    BtStatus, RawAddress,
};

use btif_macros::{btif_callback, btif_callbacks_dispatcher};

use log::{debug, info, warn};
use num_derive::{FromPrimitive, ToPrimitive};
use tokio::sync::mpsc::UnboundedSender;

use crate::callbacks::{
    callback_slot_accessors, deliver_callback, BtResult, Callbacks, PendingCallback,
};
use crate::converters::{
    convert_address_to_hex, convert_address_to_string, DeviceInfo, DeviceSdpInfo, DiscoveryInfo,
};
use crate::error::{check_result, check_status, get_error_code, BtError};
use crate::socket::dispatch_socket_callbacks;
use crate::uuid::{get_service_mask_from_uuid_list, BtServiceClass};
use crate::{BluetoothStack, Message};

/// Longest adapter name accepted, in bytes.
pub const BT_ADAPTER_NAME_MAX_LEN: usize = 248;

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtAdapterState {
    Disabled = 0,
    Enabled,
}

impl From<BtState> for BtAdapterState {
    fn from(state: BtState) -> Self {
        match state {
            BtState::On => BtAdapterState::Enabled,
            BtState::Off => BtAdapterState::Disabled,
        }
    }
}

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtAdapterVisibilityMode {
    NonDiscoverable = 0,
    GeneralDiscoverable,
    LimitedDiscoverable,
}

impl From<BtDiscoverableMode> for BtAdapterVisibilityMode {
    fn from(mode: BtDiscoverableMode) -> Self {
        match mode {
            BtDiscoverableMode::Connectable => BtAdapterVisibilityMode::NonDiscoverable,
            BtDiscoverableMode::GeneralDiscoverable => BtAdapterVisibilityMode::GeneralDiscoverable,
            BtDiscoverableMode::TimeLimitedDiscoverable => {
                BtAdapterVisibilityMode::LimitedDiscoverable
            }
        }
    }
}

impl From<BtAdapterVisibilityMode> for BtDiscoverableMode {
    fn from(mode: BtAdapterVisibilityMode) -> Self {
        match mode {
            BtAdapterVisibilityMode::NonDiscoverable => BtDiscoverableMode::Connectable,
            BtAdapterVisibilityMode::GeneralDiscoverable => BtDiscoverableMode::GeneralDiscoverable,
            BtAdapterVisibilityMode::LimitedDiscoverable => {
                BtDiscoverableMode::TimeLimitedDiscoverable
            }
        }
    }
}

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtAdapterDeviceDiscoveryState {
    Started = 0,
    Finished,
    Found,
}

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtDeviceAuthorization {
    Authorized = 0,
    Unauthorized,
}

/// Implementation of the adapter API.
///
/// Holds the native stack and the callbacks registered by the application. Share it as
/// `Arc<Mutex<Bluetooth>>` with `Stack::dispatch`. Callbacks run with that lock released, so
/// they may lock the context and call back into it.
pub struct Bluetooth {
    tx: UnboundedSender<Message>,
    pub(crate) intf: Box<dyn BluetoothStack>,
    initialized: bool,
    pub(crate) hid_initialized: bool,
    pub(crate) callbacks: Callbacks,
    pending: Vec<PendingCallback>,
}

impl Bluetooth {
    /// Constructs the context. Native events will be posted to `tx`.
    pub fn new(tx: UnboundedSender<Message>, intf: Box<dyn BluetoothStack>) -> Bluetooth {
        Bluetooth {
            tx,
            intf,
            initialized: false,
            hid_initialized: false,
            callbacks: Callbacks::new(),
            pending: vec![],
        }
    }

    pub(crate) fn tx(&self) -> UnboundedSender<Message> {
        self.tx.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn check_init_status(&self) -> Result<(), BtError> {
        if !self.initialized {
            warn!("Bluetooth is not initialized");
            return Err(BtError::NotInitialized);
        }
        Ok(())
    }

    /// Connects to the native stack. Calling it again once initialized does nothing.
    pub fn initialize(&mut self) -> Result<(), BtError> {
        if self.initialized {
            debug!("Bluetooth already initialized");
            return Ok(());
        }

        let dispatcher = get_bt_dispatcher(self.tx());
        check_status("initialize", self.intf.register_callback(dispatcher))?;
        self.initialized = true;
        info!("Bluetooth initialized");
        Ok(())
    }

    /// Disconnects from the native stack and forgets every registered callback.
    pub fn deinitialize(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;

        if self.hid_initialized {
            // Failing to shut HID down must not keep the rest registered.
            let _ = check_status("hid_host_deinitialize", self.intf.hid_deinit());
            self.hid_initialized = false;
        }

        let status = self.intf.unregister_callback();
        self.callbacks.clear();
        self.initialized = false;
        info!("Bluetooth deinitialized");

        check_status("deinitialize", status)
    }

    pub fn adapter_enable(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("adapter_enable", self.intf.enable_adapter())
    }

    pub fn adapter_disable(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("adapter_disable", self.intf.disable_adapter())
    }

    pub fn adapter_get_state(&self) -> Result<BtAdapterState, BtError> {
        self.check_init_status()?;
        Ok(BtAdapterState::from(self.intf.check_adapter()))
    }

    pub fn adapter_get_address(&self) -> Result<String, BtError> {
        self.check_init_status()?;
        let addr = check_result("adapter_get_address", self.intf.get_local_address())?;
        Ok(convert_address_to_string(&addr))
    }

    pub fn adapter_get_name(&self) -> Result<String, BtError> {
        self.check_init_status()?;
        check_result("adapter_get_name", self.intf.get_local_name())
    }

    /// Renames the local adapter. The name must be 1 to `BT_ADAPTER_NAME_MAX_LEN` bytes long.
    pub fn adapter_set_name(&mut self, name: &str) -> Result<(), BtError> {
        self.check_init_status()?;
        if name.is_empty() || name.len() > BT_ADAPTER_NAME_MAX_LEN {
            warn!("Invalid adapter name length {}", name.len());
            return Err(BtError::InvalidParameter);
        }
        check_status("adapter_set_name", self.intf.set_local_name(name))
    }

    /// Returns the visibility mode and, for the limited mode, the discoverable duration in
    /// seconds (0 otherwise).
    pub fn adapter_get_visibility(&self) -> Result<(BtAdapterVisibilityMode, i32), BtError> {
        self.check_init_status()?;
        let mode = BtAdapterVisibilityMode::from(check_result(
            "adapter_get_visibility",
            self.intf.get_discoverable_mode(),
        )?);

        let duration = match mode {
            BtAdapterVisibilityMode::LimitedDiscoverable => {
                check_result("adapter_get_visibility", self.intf.get_discoverable_timeout())?
            }
            _ => 0,
        };

        Ok((mode, duration))
    }

    /// Changes the visibility mode. `timeout_sec` only applies to the limited mode.
    pub fn adapter_set_visibility(
        &mut self,
        mode: BtAdapterVisibilityMode,
        timeout_sec: i32,
    ) -> Result<(), BtError> {
        self.check_init_status()?;

        let timeout = match mode {
            BtAdapterVisibilityMode::LimitedDiscoverable if timeout_sec < 0 => {
                warn!("Invalid visibility timeout {}", timeout_sec);
                return Err(BtError::InvalidParameter);
            }
            BtAdapterVisibilityMode::LimitedDiscoverable => timeout_sec,
            _ => 0,
        };
        let status = self.intf.set_discoverable_mode(mode.into(), timeout);
        check_status("adapter_set_visibility", status)
    }

    pub fn adapter_start_device_discovery(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("adapter_start_device_discovery", self.intf.start_discovery())
    }

    pub fn adapter_stop_device_discovery(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("adapter_stop_device_discovery", self.intf.cancel_discovery())
    }

    pub fn adapter_is_discovering(&self) -> Result<bool, BtError> {
        self.check_init_status()?;
        check_result("adapter_is_discovering", self.intf.is_discovering())
    }

    /// Calls `callback` for each bonded device until it returns false.
    ///
    /// A device record that cannot be converted stops the iteration and its error is returned.
    pub fn adapter_foreach_bonded_device<F>(&self, mut callback: F) -> Result<(), BtError>
    where
        F: FnMut(&DeviceInfo) -> bool,
    {
        self.check_init_status()?;
        let devices =
            check_result("adapter_foreach_bonded_device", self.intf.get_bonded_device_list())?;

        for device in devices.iter() {
            let info = DeviceInfo::try_from(device)?;
            if !callback(&info) {
                break;
            }
        }

        Ok(())
    }

    pub fn adapter_get_bonded_device_info(
        &self,
        remote_address: &str,
    ) -> Result<DeviceInfo, BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        let device =
            check_result("adapter_get_bonded_device_info", self.intf.get_bonded_device(&addr))?;
        DeviceInfo::try_from(&device)
    }

    /// Returns whether a local service is registered for `service_uuid`.
    pub fn adapter_is_service_used(&self, service_uuid: &str) -> Result<bool, BtError> {
        self.check_init_status()?;
        if service_uuid.is_empty() {
            warn!("Empty service uuid");
            return Err(BtError::InvalidParameter);
        }
        check_result("adapter_is_service_used", self.intf.is_service_used(service_uuid))
    }

    pub fn device_create_bond(&mut self, remote_address: &str) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("device_create_bond", self.intf.bond_device(&addr))
    }

    pub fn device_cancel_bonding(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("device_cancel_bonding", self.intf.cancel_bonding())
    }

    pub fn device_destroy_bond(&mut self, remote_address: &str) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("device_destroy_bond", self.intf.unbond_device(&addr))
    }

    pub fn device_set_alias(&mut self, remote_address: &str, alias: &str) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("device_set_alias", self.intf.set_alias(&addr, alias))
    }

    pub fn device_set_authorization(
        &mut self,
        remote_address: &str,
        authorization: BtDeviceAuthorization,
    ) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        let authorized = authorization == BtDeviceAuthorization::Authorized;
        check_status("device_set_authorization", self.intf.authorize_device(&addr, authorized))
    }

    pub fn device_start_service_search(&mut self, remote_address: &str) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_status("device_start_service_search", self.intf.search_service(&addr))
    }

    pub fn device_cancel_service_search(&mut self) -> Result<(), BtError> {
        self.check_init_status()?;
        check_status("device_cancel_service_search", self.intf.cancel_service_search())
    }

    /// Folds the service classes named by `uuids` into a mask.
    pub fn device_get_service_mask_from_uuid_list(
        &self,
        uuids: &[String],
    ) -> Result<BtServiceClass, BtError> {
        self.check_init_status()?;
        if uuids.is_empty() {
            warn!("Empty uuid list");
            return Err(BtError::InvalidParameter);
        }
        Ok(get_service_mask_from_uuid_list(uuids))
    }

    pub(crate) fn defer<F>(&mut self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.push(Box::new(f));
    }

    /// Removes the callback invocations queued by the events handled so far.
    pub fn take_pending_callbacks(&mut self) -> Vec<PendingCallback> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn run_pending_callbacks(&mut self) {
        for cb in self.take_pending_callbacks() {
            cb();
        }
    }

    /// Converts a native event and queues the invocation of the callback registered for it.
    pub fn handle_base_callbacks(&mut self, cb: BaseCallbacks) {
        match cb {
            BaseCallbacks::RfcommDataReceived(..)
            | BaseCallbacks::RfcommConnected(..)
            | BaseCallbacks::RfcommDisconnected(..)
            | BaseCallbacks::RfcommConnectionRequested(..) => dispatch_socket_callbacks(self, cb),
            _ => dispatch_adapter_callbacks(self, cb),
        }
    }

    /// Delivers a native event to the callback registered for it right away.
    ///
    /// Use `Stack::deliver` instead when the context is shared behind a lock.
    pub fn dispatch_base_callbacks(&mut self, cb: BaseCallbacks) {
        self.handle_base_callbacks(cb);
        self.run_pending_callbacks();
    }
}

callback_slot_accessors! {
    AdapterStateChanged => adapter_set_state_changed_cb, adapter_unset_state_changed_cb,
        FnMut(BtResult, BtAdapterState);
    AdapterNameChanged => adapter_set_name_changed_cb, adapter_unset_name_changed_cb,
        FnMut(&str);
    AdapterVisibilityModeChanged => adapter_set_visibility_mode_changed_cb,
        adapter_unset_visibility_mode_changed_cb, FnMut(BtResult, BtAdapterVisibilityMode);
    AdapterDeviceDiscoveryStateChanged => adapter_set_device_discovery_state_changed_cb,
        adapter_unset_device_discovery_state_changed_cb,
        FnMut(BtResult, BtAdapterDeviceDiscoveryState, Option<&DiscoveryInfo>);
    DeviceBondCreated => device_set_bond_created_cb, device_unset_bond_created_cb,
        FnMut(BtResult, Option<&DeviceInfo>);
    DeviceBondDestroyed => device_set_bond_destroyed_cb, device_unset_bond_destroyed_cb,
        FnMut(BtResult, &str);
    DeviceAuthorizationChanged => device_set_authorization_changed_cb,
        device_unset_authorization_changed_cb, FnMut(BtDeviceAuthorization, &str);
    DeviceServiceSearched => device_set_service_searched_cb, device_unset_service_searched_cb,
        FnMut(BtResult, Option<&DeviceSdpInfo>);
    DeviceConnectionStateChanged => device_set_connection_state_changed_cb,
        device_unset_connection_state_changed_cb, FnMut(bool, &str);
}

/// Returns the dispatcher handed to the native stack. Events are posted to the dispatch loop in
/// the order they are emitted.
pub fn get_bt_dispatcher(tx: UnboundedSender<Message>) -> BaseCallbacksDispatcher {
    BaseCallbacksDispatcher {
        dispatch: Box::new(move |cb| {
            if let Err(e) = tx.send(Message::Base(cb)) {
                debug!("Dispatch loop is gone, dropping {:?}", e.0);
            }
        }),
    }
}

#[btif_callbacks_dispatcher(dispatch_adapter_callbacks, BaseCallbacks)]
pub(crate) trait BtifBluetoothCallbacks {
    #[btif_callback(AdapterEnabled)]
    fn adapter_enabled(&mut self, status: BtStatus);

    #[btif_callback(AdapterDisabled)]
    fn adapter_disabled(&mut self, status: BtStatus);

    #[btif_callback(LocalNameChanged)]
    fn local_name_changed(&mut self, status: BtStatus, name: String);

    #[btif_callback(DiscoverableModeChanged)]
    fn discoverable_mode_changed(&mut self, status: BtStatus, mode: BtDiscoverableMode);

    #[btif_callback(DiscoveryStarted)]
    fn discovery_started(&mut self, status: BtStatus);

    #[btif_callback(DiscoveryFinished)]
    fn discovery_finished(&mut self, status: BtStatus);

    #[btif_callback(RemoteDeviceFound)]
    fn remote_device_found(&mut self, status: BtStatus, device: BtDeviceInfo);

    #[btif_callback(BondingFinished)]
    fn bonding_finished(&mut self, status: BtStatus, device: BtDeviceInfo);

    #[btif_callback(BondedDeviceRemoved)]
    fn bonded_device_removed(&mut self, status: BtStatus, addr: RawAddress);

    #[btif_callback(DeviceAuthorized)]
    fn device_authorized(&mut self, status: BtStatus, addr: RawAddress);

    #[btif_callback(DeviceUnauthorized)]
    fn device_unauthorized(&mut self, status: BtStatus, addr: RawAddress);

    #[btif_callback(ServiceSearched)]
    fn service_searched(&mut self, status: BtStatus, sdp: BtSdpInfo);

    #[btif_callback(DeviceConnected)]
    fn device_connected(&mut self, status: BtStatus, addr: RawAddress);

    #[btif_callback(DeviceDisconnected)]
    fn device_disconnected(&mut self, status: BtStatus, addr: RawAddress);
}

impl Bluetooth {
    fn adapter_state_changed(&mut self, status: BtStatus, state: BtAdapterState) {
        deliver_callback!(self, AdapterStateChanged, |cb| cb(get_error_code(status), state));
    }

    fn discovery_state_changed(&mut self, status: BtStatus, state: BtAdapterDeviceDiscoveryState) {
        deliver_callback!(self, AdapterDeviceDiscoveryStateChanged, |cb| {
            cb(get_error_code(status), state, None)
        });
    }

    fn authorization_changed(&mut self, authorization: BtDeviceAuthorization, addr: RawAddress) {
        deliver_callback!(self, DeviceAuthorizationChanged, |cb| {
            cb(authorization, &convert_address_to_string(&addr))
        });
    }

    fn connection_state_changed(&mut self, connected: bool, addr: RawAddress) {
        deliver_callback!(self, DeviceConnectionStateChanged, |cb| {
            cb(connected, &convert_address_to_string(&addr))
        });
    }
}

impl BtifBluetoothCallbacks for Bluetooth {
    fn adapter_enabled(&mut self, status: BtStatus) {
        self.adapter_state_changed(status, BtAdapterState::Enabled);
    }

    fn adapter_disabled(&mut self, status: BtStatus) {
        self.adapter_state_changed(status, BtAdapterState::Disabled);
    }

    fn local_name_changed(&mut self, status: BtStatus, name: String) {
        if status != BtStatus::Success {
            debug!("Local name changed with status {:?}", status);
        }
        deliver_callback!(self, AdapterNameChanged, |cb| cb(&name));
    }

    fn discoverable_mode_changed(&mut self, status: BtStatus, mode: BtDiscoverableMode) {
        deliver_callback!(self, AdapterVisibilityModeChanged, |cb| {
            cb(get_error_code(status), BtAdapterVisibilityMode::from(mode))
        });
    }

    fn discovery_started(&mut self, status: BtStatus) {
        self.discovery_state_changed(status, BtAdapterDeviceDiscoveryState::Started);
    }

    fn discovery_finished(&mut self, status: BtStatus) {
        self.discovery_state_changed(status, BtAdapterDeviceDiscoveryState::Finished);
    }

    fn remote_device_found(&mut self, status: BtStatus, device: BtDeviceInfo) {
        deliver_callback!(self, AdapterDeviceDiscoveryStateChanged, |cb| {
            let info = DiscoveryInfo::try_from(&device).ok();
            cb(get_error_code(status), BtAdapterDeviceDiscoveryState::Found, info.as_ref())
        });
    }

    fn bonding_finished(&mut self, status: BtStatus, device: BtDeviceInfo) {
        deliver_callback!(self, DeviceBondCreated, |cb| {
            let info = DeviceInfo::try_from(&device).ok();
            cb(get_error_code(status), info.as_ref())
        });
    }

    fn bonded_device_removed(&mut self, status: BtStatus, addr: RawAddress) {
        deliver_callback!(self, DeviceBondDestroyed, |cb| {
            cb(get_error_code(status), &convert_address_to_string(&addr))
        });
    }

    fn device_authorized(&mut self, _status: BtStatus, addr: RawAddress) {
        self.authorization_changed(BtDeviceAuthorization::Authorized, addr);
    }

    fn device_unauthorized(&mut self, _status: BtStatus, addr: RawAddress) {
        self.authorization_changed(BtDeviceAuthorization::Unauthorized, addr);
    }

    fn service_searched(&mut self, status: BtStatus, sdp: BtSdpInfo) {
        deliver_callback!(self, DeviceServiceSearched, |cb| {
            let info = DeviceSdpInfo::try_from(&sdp).ok();
            cb(get_error_code(status), info.as_ref())
        });
    }

    fn device_connected(&mut self, _status: BtStatus, addr: RawAddress) {
        self.connection_state_changed(true, addr);
    }

    fn device_disconnected(&mut self, _status: BtStatus, addr: RawAddress) {
        self.connection_state_changed(false, addr);
    }
}
