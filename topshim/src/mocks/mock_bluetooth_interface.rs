//! Mocked implementation of the native interfaces for use in test

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, unbounded_channel, UnboundedReceiver};

use crate::btif::{
    BaseCallbacks, BaseCallbacksDispatcher, BluetoothInterface, BtDeviceInfo, BtDiscoverableMode,
    BtState, BtStatus, RawAddress,
};
use crate::profiles::hid_host::{HHCallbacks, HHCallbacksDispatcher, HidHostInterface};
use crate::profiles::socket::RfcommInterface;

/// Events representing calls into the native interfaces
#[derive(Debug, PartialEq)]
pub enum MockInterfaceEvents {
    RegisterCallback,
    UnregisterCallback,
    EnableAdapter,
    DisableAdapter,
    SetLocalName(String),
    SetDiscoverableMode(BtDiscoverableMode, i32),
    StartDiscovery,
    CancelDiscovery,
    GetBondedDeviceList,
    GetBondedDevice(RawAddress),
    BondDevice(RawAddress),
    CancelBonding,
    UnbondDevice(RawAddress),
    SetAlias(RawAddress, String),
    AuthorizeDevice(RawAddress, bool),
    SearchService(RawAddress),
    CancelServiceSearch,
    RfcommCreateSocket(String),
    RfcommRemoveSocket(i32),
    RfcommListenAndAccept(i32, i32),
    RfcommListen(i32, i32),
    RfcommAcceptConnection(i32),
    RfcommRejectConnection(i32),
    RfcommConnect(RawAddress, String),
    RfcommDisconnect(i32),
    RfcommWrite(i32, Vec<u8>),
    HidInit,
    HidDeinit,
    HidConnect(RawAddress),
    HidDisconnect(RawAddress),
}

/// Handle used by tests to emit events through the dispatchers the API layer registered.
#[derive(Clone)]
pub struct MockEventSource {
    base: Arc<Mutex<Option<BaseCallbacksDispatcher>>>,
    hid_host: Arc<Mutex<Option<HHCallbacksDispatcher>>>,
}

impl MockEventSource {
    /// Emits a base event. Returns false if no dispatcher is registered.
    pub fn fire(&self, cb: BaseCallbacks) -> bool {
        match self.base.lock().unwrap().as_ref() {
            Some(dispatcher) => {
                (dispatcher.dispatch)(cb);
                true
            }
            None => false,
        }
    }

    /// Emits a HID host event. Returns false if no dispatcher is registered.
    pub fn fire_hid_host(&self, cb: HHCallbacks) -> bool {
        match self.hid_host.lock().unwrap().as_ref() {
            Some(dispatcher) => {
                (dispatcher.dispatch)(cb);
                true
            }
            None => false,
        }
    }
}

/// Records calls into a channel of MockInterfaceEvents and answers getters from its public
/// fields. Every command returns `status`.
pub struct MockBluetoothInterface {
    events_tx: mpsc::UnboundedSender<MockInterfaceEvents>,
    source: MockEventSource,
    next_fd: i32,

    pub status: BtStatus,
    pub state: BtState,
    pub local_address: RawAddress,
    pub local_name: String,
    pub discoverable_mode: BtDiscoverableMode,
    pub discoverable_timeout: i32,
    pub discovering: bool,
    pub bonded_devices: Vec<BtDeviceInfo>,
    pub used_services: Vec<String>,
}

impl MockBluetoothInterface {
    /// Constructor. Returns self and the RX side of the associated channel.
    pub fn new() -> (Self, UnboundedReceiver<MockInterfaceEvents>) {
        let (events_tx, events_rx) = unbounded_channel();
        let source = MockEventSource {
            base: Arc::new(Mutex::new(None)),
            hid_host: Arc::new(Mutex::new(None)),
        };
        (
            Self {
                events_tx,
                source,
                next_fd: 10,
                status: BtStatus::Success,
                state: BtState::Off,
                local_address: RawAddress::default(),
                local_name: String::new(),
                discoverable_mode: BtDiscoverableMode::Connectable,
                discoverable_timeout: 0,
                discovering: false,
                bonded_devices: vec![],
                used_services: vec![],
            },
            events_rx,
        )
    }

    /// Returns a handle emitting events into the registered dispatchers.
    pub fn event_source(&self) -> MockEventSource {
        self.source.clone()
    }

    fn record(&self, event: MockInterfaceEvents) -> BtStatus {
        // The test may have dropped the receiver; that only means nobody is watching.
        let _ = self.events_tx.send(event);
        self.status
    }

    fn answer<T>(&self, value: T) -> Result<T, BtStatus> {
        match self.status {
            BtStatus::Success => Ok(value),
            status => Err(status),
        }
    }
}

impl BluetoothInterface for MockBluetoothInterface {
    fn register_callback(&mut self, dispatcher: BaseCallbacksDispatcher) -> BtStatus {
        *self.source.base.lock().unwrap() = Some(dispatcher);
        self.record(MockInterfaceEvents::RegisterCallback)
    }

    fn unregister_callback(&mut self) -> BtStatus {
        *self.source.base.lock().unwrap() = None;
        self.record(MockInterfaceEvents::UnregisterCallback)
    }

    fn enable_adapter(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::EnableAdapter)
    }

    fn disable_adapter(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::DisableAdapter)
    }

    fn check_adapter(&self) -> BtState {
        self.state
    }

    fn get_local_address(&self) -> Result<RawAddress, BtStatus> {
        self.answer(self.local_address)
    }

    fn get_local_name(&self) -> Result<String, BtStatus> {
        self.answer(self.local_name.clone())
    }

    fn set_local_name(&mut self, name: &str) -> BtStatus {
        self.record(MockInterfaceEvents::SetLocalName(name.to_string()))
    }

    fn get_discoverable_mode(&self) -> Result<BtDiscoverableMode, BtStatus> {
        self.answer(self.discoverable_mode)
    }

    fn get_discoverable_timeout(&self) -> Result<i32, BtStatus> {
        self.answer(self.discoverable_timeout)
    }

    fn set_discoverable_mode(&mut self, mode: BtDiscoverableMode, timeout: i32) -> BtStatus {
        self.record(MockInterfaceEvents::SetDiscoverableMode(mode, timeout))
    }

    fn start_discovery(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::StartDiscovery)
    }

    fn cancel_discovery(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::CancelDiscovery)
    }

    fn is_discovering(&self) -> Result<bool, BtStatus> {
        self.answer(self.discovering)
    }

    fn get_bonded_device_list(&self) -> Result<Vec<BtDeviceInfo>, BtStatus> {
        let _ = self.events_tx.send(MockInterfaceEvents::GetBondedDeviceList);
        self.answer(self.bonded_devices.clone())
    }

    fn get_bonded_device(&self, addr: &RawAddress) -> Result<BtDeviceInfo, BtStatus> {
        let _ = self.events_tx.send(MockInterfaceEvents::GetBondedDevice(*addr));
        let device = self.answer(self.bonded_devices.iter().find(|d| d.addr == *addr).cloned())?;
        device.ok_or(BtStatus::NotPaired)
    }

    fn is_service_used(&self, uuid: &str) -> Result<bool, BtStatus> {
        self.answer(self.used_services.iter().any(|u| u.eq_ignore_ascii_case(uuid)))
    }

    fn bond_device(&mut self, addr: &RawAddress) -> BtStatus {
        self.record(MockInterfaceEvents::BondDevice(*addr))
    }

    fn cancel_bonding(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::CancelBonding)
    }

    fn unbond_device(&mut self, addr: &RawAddress) -> BtStatus {
        self.record(MockInterfaceEvents::UnbondDevice(*addr))
    }

    fn set_alias(&mut self, addr: &RawAddress, alias: &str) -> BtStatus {
        self.record(MockInterfaceEvents::SetAlias(*addr, alias.to_string()))
    }

    fn authorize_device(&mut self, addr: &RawAddress, authorized: bool) -> BtStatus {
        self.record(MockInterfaceEvents::AuthorizeDevice(*addr, authorized))
    }

    fn search_service(&mut self, addr: &RawAddress) -> BtStatus {
        self.record(MockInterfaceEvents::SearchService(*addr))
    }

    fn cancel_service_search(&mut self) -> BtStatus {
        self.record(MockInterfaceEvents::CancelServiceSearch)
    }
}

impl RfcommInterface for MockBluetoothInterface {
    fn rfcomm_create_socket(&mut self, uuid: &str) -> Result<i32, BtStatus> {
        self.record(MockInterfaceEvents::RfcommCreateSocket(uuid.to_string()));
        let fd = self.answer(self.next_fd)?;
        self.next_fd += 1;
        Ok(fd)
    }

    fn rfcomm_remove_socket(&mut self, socket_fd: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommRemoveSocket(socket_fd))
    }

    fn rfcomm_listen_and_accept(&mut self, socket_fd: i32, max_pending: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommListenAndAccept(socket_fd, max_pending))
    }

    fn rfcomm_listen(&mut self, socket_fd: i32, max_pending: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommListen(socket_fd, max_pending))
    }

    fn rfcomm_accept_connection(&mut self, socket_fd: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommAcceptConnection(socket_fd))
    }

    fn rfcomm_reject_connection(&mut self, socket_fd: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommRejectConnection(socket_fd))
    }

    fn rfcomm_connect(&mut self, addr: &RawAddress, uuid: &str) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommConnect(*addr, uuid.to_string()))
    }

    fn rfcomm_disconnect(&mut self, socket_fd: i32) -> BtStatus {
        self.record(MockInterfaceEvents::RfcommDisconnect(socket_fd))
    }

    fn rfcomm_write(&mut self, socket_fd: i32, data: &[u8]) -> Result<usize, BtStatus> {
        self.record(MockInterfaceEvents::RfcommWrite(socket_fd, data.to_vec()));
        self.answer(data.len())
    }
}

impl HidHostInterface for MockBluetoothInterface {
    fn hid_init(&mut self, dispatcher: HHCallbacksDispatcher) -> BtStatus {
        *self.source.hid_host.lock().unwrap() = Some(dispatcher);
        self.record(MockInterfaceEvents::HidInit)
    }

    fn hid_deinit(&mut self) -> BtStatus {
        *self.source.hid_host.lock().unwrap() = None;
        self.record(MockInterfaceEvents::HidDeinit)
    }

    fn hid_connect(&mut self, addr: &RawAddress) -> BtStatus {
        self.record(MockInterfaceEvents::HidConnect(*addr))
    }

    fn hid_disconnect(&mut self, addr: &RawAddress) -> BtStatus {
        self.record(MockInterfaceEvents::HidDisconnect(*addr))
    }
}
