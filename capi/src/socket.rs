//! RFCOMM sockets.

use bt_topshim::btif::{BaseCallbacks, BtStatus};
use bt_topshim::profiles::socket::{
    BtRfcommConnection, BtRfcommConnectionRequest, BtRfcommReceivedData,
};

use btif_macros::{btif_callback, btif_callbacks_dispatcher};

use log::{debug, warn};
use num_derive::{FromPrimitive, ToPrimitive};

use crate::bluetooth::Bluetooth;
use crate::callbacks::{callback_slot_accessors, deliver_callback, BtResult};
use crate::converters::{
    convert_address_to_hex, convert_address_to_string, SocketConnection, SocketReceivedData,
};
use crate::error::{check_result, check_status, get_error_code, BtError};

#[derive(Clone, Copy, Debug, FromPrimitive, ToPrimitive, PartialEq, Eq)]
#[repr(u32)]
pub enum BtSocketConnectionState {
    Connected = 0,
    Disconnected,
}

fn check_socket_fd(socket_fd: i32) -> Result<(), BtError> {
    if socket_fd < 0 {
        warn!("Invalid socket fd {}", socket_fd);
        return Err(BtError::InvalidParameter);
    }
    Ok(())
}

fn check_service_uuid(service_uuid: &str) -> Result<(), BtError> {
    if service_uuid.is_empty() {
        warn!("Empty service uuid");
        return Err(BtError::InvalidParameter);
    }
    Ok(())
}

impl Bluetooth {
    /// Registers an RFCOMM server socket for `service_uuid` and returns its fd.
    pub fn socket_create_rfcomm(&mut self, service_uuid: &str) -> Result<i32, BtError> {
        self.check_init_status()?;
        check_service_uuid(service_uuid)?;
        check_result("socket_create_rfcomm", self.intf.rfcomm_create_socket(service_uuid))
    }

    pub fn socket_destroy_rfcomm(&mut self, socket_fd: i32) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        check_status("socket_destroy_rfcomm", self.intf.rfcomm_remove_socket(socket_fd))
    }

    /// Listens on `socket_fd`, accepting incoming connections without asking.
    pub fn socket_listen_and_accept_rfcomm(
        &mut self,
        socket_fd: i32,
        max_pending_connections: i32,
    ) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        let status = self.intf.rfcomm_listen_and_accept(socket_fd, max_pending_connections);
        check_status("socket_listen_and_accept_rfcomm", status)
    }

    /// Listens on `socket_fd`. Each incoming connection is reported to the connection requested
    /// callback and waits for `socket_accept` or `socket_reject`.
    pub fn socket_listen_rfcomm(
        &mut self,
        socket_fd: i32,
        max_pending_connections: i32,
    ) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        let status = self.intf.rfcomm_listen(socket_fd, max_pending_connections);
        check_status("socket_listen_rfcomm", status)
    }

    pub fn socket_accept(&mut self, requested_socket_fd: i32) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(requested_socket_fd)?;
        check_status("socket_accept", self.intf.rfcomm_accept_connection(requested_socket_fd))
    }

    pub fn socket_reject(&mut self, socket_fd: i32) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        check_status("socket_reject", self.intf.rfcomm_reject_connection(socket_fd))
    }

    /// Connects to the RFCOMM service `service_uuid` of a remote device. The outcome is reported
    /// to the connection state changed callback.
    pub fn socket_connect_rfcomm(
        &mut self,
        remote_address: &str,
        service_uuid: &str,
    ) -> Result<(), BtError> {
        self.check_init_status()?;
        let addr = convert_address_to_hex(remote_address)?;
        check_service_uuid(service_uuid)?;
        check_status("socket_connect_rfcomm", self.intf.rfcomm_connect(&addr, service_uuid))
    }

    pub fn socket_disconnect_rfcomm(&mut self, socket_fd: i32) -> Result<(), BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        check_status("socket_disconnect_rfcomm", self.intf.rfcomm_disconnect(socket_fd))
    }

    /// Writes `data` to a connected socket and returns the number of bytes written.
    pub fn socket_send_data(&mut self, socket_fd: i32, data: &[u8]) -> Result<usize, BtError> {
        self.check_init_status()?;
        check_socket_fd(socket_fd)?;
        check_result("socket_send_data", self.intf.rfcomm_write(socket_fd, data))
    }
}

callback_slot_accessors! {
    SocketDataReceived => socket_set_data_received_cb, socket_unset_data_received_cb,
        FnMut(&SocketReceivedData);
    SocketConnectionStateChanged => socket_set_connection_state_changed_cb,
        socket_unset_connection_state_changed_cb,
        FnMut(BtResult, BtSocketConnectionState, Option<&SocketConnection>);
    SocketConnectionRequested => socket_set_connection_requested_cb,
        socket_unset_connection_requested_cb, FnMut(i32, &str);
}

#[btif_callbacks_dispatcher(dispatch_socket_callbacks, BaseCallbacks)]
pub(crate) trait BtifSocketCallbacks {
    #[btif_callback(RfcommDataReceived)]
    fn rfcomm_data_received(&mut self, status: BtStatus, data: BtRfcommReceivedData);

    #[btif_callback(RfcommConnected)]
    fn rfcomm_connected(&mut self, status: BtStatus, connection: BtRfcommConnection);

    #[btif_callback(RfcommDisconnected)]
    fn rfcomm_disconnected(&mut self, status: BtStatus, connection: BtRfcommConnection);

    #[btif_callback(RfcommConnectionRequested)]
    fn rfcomm_connection_requested(&mut self, status: BtStatus, request: BtRfcommConnectionRequest);
}

impl Bluetooth {
    fn rfcomm_connection_state_changed(
        &mut self,
        status: BtStatus,
        state: BtSocketConnectionState,
        connection: BtRfcommConnection,
    ) {
        deliver_callback!(self, SocketConnectionStateChanged, |cb| {
            let connection = SocketConnection::from(&connection);
            cb(get_error_code(status), state, Some(&connection))
        });
    }
}

impl BtifSocketCallbacks for Bluetooth {
    fn rfcomm_data_received(&mut self, status: BtStatus, data: BtRfcommReceivedData) {
        if status != BtStatus::Success {
            debug!("Dropping data on socket {} with status {:?}", data.socket_fd, status);
            return;
        }
        deliver_callback!(self, SocketDataReceived, |cb| cb(&SocketReceivedData::from(data)));
    }

    fn rfcomm_connected(&mut self, status: BtStatus, connection: BtRfcommConnection) {
        let state = BtSocketConnectionState::Connected;
        self.rfcomm_connection_state_changed(status, state, connection);
    }

    fn rfcomm_disconnected(&mut self, status: BtStatus, connection: BtRfcommConnection) {
        self.rfcomm_connection_state_changed(
            status,
            BtSocketConnectionState::Disconnected,
            connection,
        );
    }

    fn rfcomm_connection_requested(
        &mut self,
        _status: BtStatus,
        request: BtRfcommConnectionRequest,
    ) {
        deliver_callback!(self, SocketConnectionRequested, |cb| {
            cb(request.socket_fd, &convert_address_to_string(&request.device_addr))
        });
    }
}
