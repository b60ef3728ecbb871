mod utils;

use std::sync::{Arc, Mutex};

use bt_capi::bluetooth::{
    BtAdapterDeviceDiscoveryState, BtAdapterState, BtAdapterVisibilityMode, BtDeviceAuthorization,
};
use bt_capi::converters::{DeviceSdpInfo, DiscoveryInfo, SocketConnection};
use bt_capi::error::BtError;
use bt_capi::socket::BtSocketConnectionState;
use bt_capi::Stack;
use bt_topshim::btif::{
    BaseCallbacks, BtDeviceClass, BtDeviceInfo, BtDiscoverableMode, BtSdpInfo, BtStatus,
    RawAddress,
};
use bt_topshim::mocks::mock_bluetooth_interface::MockInterfaceEvents;
use bt_topshim::profiles::socket::{
    BtRfcommConnection, BtRfcommConnectionRequest, BtRfcommReceivedData, BtSocketRole,
};
use tokio::sync::mpsc::unbounded_channel;
use utils::TestStack;

type DiscoveryEvent = (Result<(), BtError>, BtAdapterDeviceDiscoveryState, Option<DiscoveryInfo>);

const PEER: RawAddress = RawAddress { address: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55] };

fn bonded_device(last: u8, name: &str) -> BtDeviceInfo {
    named_device(last, name.as_bytes())
}

fn named_device(last: u8, name: &[u8]) -> BtDeviceInfo {
    BtDeviceInfo {
        addr: RawAddress { address: [0x00, 0x11, 0x22, 0x33, 0x44, last] },
        name: name.to_vec(),
        class: BtDeviceClass::from(0x5a020c),
        paired: true,
        service_index: 1,
        uuids: vec!["00001101-0000-1000-8000-00805f9b34fb".into()],
        ..Default::default()
    }
}

#[test]
fn test_adapter_enabled_reaches_callback() {
    let mut stack = TestStack::start(|_| {});

    let seen = Arc::new(Mutex::new(vec![]));
    let seen_cb = seen.clone();
    let tag = String::from("tag");
    stack
        .bluetooth
        .lock()
        .unwrap()
        .adapter_set_state_changed_cb(move |result, state| {
            seen_cb.lock().unwrap().push((result, state, tag.clone()));
        })
        .unwrap();

    assert!(stack.source.fire(BaseCallbacks::AdapterEnabled(BtStatus::Success)));
    assert_eq!(1, stack.drain());

    assert_eq!(
        vec![(Ok(()), BtAdapterState::Enabled, "tag".to_string())],
        *seen.lock().unwrap()
    );
}

#[test]
fn test_failure_status_is_translated() {
    let mut stack = TestStack::start(|_| {});

    let seen = Arc::new(Mutex::new(vec![]));
    let seen_cb = seen.clone();
    {
        let mut bluetooth = stack.bluetooth.lock().unwrap();
        bluetooth
            .adapter_set_visibility_mode_changed_cb(move |result, mode| {
                seen_cb.lock().unwrap().push((result, mode));
            })
            .unwrap();
    }

    stack.source.fire(BaseCallbacks::AdapterDisabled(BtStatus::DeviceBusy));
    stack.source.fire(BaseCallbacks::DiscoverableModeChanged(
        BtStatus::Success,
        BtDiscoverableMode::GeneralDiscoverable,
    ));
    stack.source.fire(BaseCallbacks::DiscoverableModeChanged(
        BtStatus::AccessDenied,
        BtDiscoverableMode::Connectable,
    ));
    assert_eq!(3, stack.drain());

    assert_eq!(
        vec![
            (Ok(()), BtAdapterVisibilityMode::GeneralDiscoverable),
            (Err(BtError::PermissionDenied), BtAdapterVisibilityMode::NonDiscoverable),
        ],
        *seen.lock().unwrap()
    );
}

#[test]
fn test_foreach_bonded_device_stops_early() {
    let mut stack = TestStack::start(|mock| {
        mock.bonded_devices =
            vec![bonded_device(1, "one"), bonded_device(2, "two"), bonded_device(3, "three")];
    });

    let mut visited = vec![];
    let result = stack.bluetooth.lock().unwrap().adapter_foreach_bonded_device(|info| {
        visited.push(info.remote_address.clone());
        visited.len() < 2
    });

    assert_eq!(Ok(()), result);
    assert_eq!(vec!["00:11:22:33:44:01".to_string(), "00:11:22:33:44:02".to_string()], visited);
    assert_eq!(Some(MockInterfaceEvents::GetBondedDeviceList), stack.calls.try_recv().ok());
    assert!(stack.calls.try_recv().is_err());
}

#[test]
fn test_foreach_bonded_device_conversion_failure() {
    let stack = TestStack::start(|mock| {
        let mut broken = bonded_device(2, "two");
        broken.service_index = 5;
        mock.bonded_devices = vec![bonded_device(1, "one"), broken, bonded_device(3, "three")];
    });

    let mut visited = 0;
    let result = stack.bluetooth.lock().unwrap().adapter_foreach_bonded_device(|_| {
        visited += 1;
        true
    });

    assert_eq!(Err(BtError::OperationFailed), result);
    assert_eq!(1, visited);
}

#[test]
fn test_legacy_device_name() {
    let mut stack = TestStack::start(|mock| {
        mock.bonded_devices = vec![named_device(1, b"Caf\xe9"), bonded_device(2, "two")];
    });

    let mut names = vec![];
    let result = stack.bluetooth.lock().unwrap().adapter_foreach_bonded_device(|info| {
        names.push(info.remote_name.clone());
        true
    });
    assert_eq!(Ok(()), result);
    assert_eq!(vec![Some("Caf\u{fffd}".to_string()), Some("two".to_string())], names);

    let seen = Arc::new(Mutex::new(vec![]));
    let seen_cb = seen.clone();
    stack
        .bluetooth
        .lock()
        .unwrap()
        .device_set_bond_created_cb(move |result, info| {
            seen_cb.lock().unwrap().push((result, info.and_then(|i| i.remote_name.clone())));
        })
        .unwrap();

    let legacy = named_device(3, b"Caf\xe9");
    stack.source.fire(BaseCallbacks::BondingFinished(BtStatus::Success, legacy));
    assert_eq!(1, stack.drain());
    assert_eq!(vec![(Ok(()), Some("Caf\u{fffd}".to_string()))], *seen.lock().unwrap());
}

#[test]
fn test_bonded_device_info() {
    let stack = TestStack::start(|mock| {
        mock.bonded_devices = vec![bonded_device(1, "one")];
    });
    let bluetooth = stack.bluetooth.lock().unwrap();

    let info = bluetooth.adapter_get_bonded_device_info("00:11:22:33:44:01").unwrap();
    assert_eq!(Some("one".to_string()), info.remote_name);
    assert!(info.is_bonded);
    assert_eq!(vec!["00001101-0000-1000-8000-00805F9B34FB".to_string()], info.service_uuids);

    assert_eq!(
        Err(BtError::RemoteDeviceNotBonded),
        bluetooth.adapter_get_bonded_device_info("00:11:22:33:44:09")
    );
    assert_eq!(
        Err(BtError::InvalidParameter),
        bluetooth.adapter_get_bonded_device_info("00:11:22:33:44")
    );
}

#[test]
fn test_unset_callback_is_not_invoked() {
    let mut stack = TestStack::start(|_| {});

    let count = Arc::new(Mutex::new(0));
    let count_cb = count.clone();
    {
        let mut bluetooth = stack.bluetooth.lock().unwrap();
        bluetooth
            .adapter_set_name_changed_cb(move |_| {
                *count_cb.lock().unwrap() += 1;
            })
            .unwrap();
        bluetooth.adapter_unset_name_changed_cb().unwrap();
        // Unset twice is fine.
        bluetooth.adapter_unset_name_changed_cb().unwrap();
    }

    stack.source.fire(BaseCallbacks::LocalNameChanged(BtStatus::Success, "Tizen".into()));
    assert_eq!(1, stack.drain());
    assert_eq!(0, *count.lock().unwrap());
}

#[test]
fn test_discovery_events() {
    let mut stack = TestStack::start(|_| {});

    let seen: Arc<Mutex<Vec<DiscoveryEvent>>> = Arc::new(Mutex::new(vec![]));
    let seen_cb = seen.clone();
    stack
        .bluetooth
        .lock()
        .unwrap()
        .adapter_set_device_discovery_state_changed_cb(move |result, state, info| {
            seen_cb.lock().unwrap().push((result, state, info.cloned()));
        })
        .unwrap();

    let mut found = bonded_device(7, "Speaker");
    found.paired = false;
    found.rssi = -42;
    let mut broken = bonded_device(8, "Broken");
    broken.service_index = 3;

    stack.source.fire(BaseCallbacks::DiscoveryStarted(BtStatus::Success));
    stack.source.fire(BaseCallbacks::RemoteDeviceFound(BtStatus::Success, found));
    stack.source.fire(BaseCallbacks::RemoteDeviceFound(BtStatus::Success, broken));
    stack.source.fire(BaseCallbacks::DiscoveryFinished(BtStatus::Success));
    assert_eq!(4, stack.drain());

    let seen = seen.lock().unwrap();
    assert_eq!(4, seen.len());
    assert_eq!((Ok(()), BtAdapterDeviceDiscoveryState::Started, None), seen[0]);

    let (result, state, info) = &seen[1];
    assert_eq!(Ok(()), *result);
    assert_eq!(BtAdapterDeviceDiscoveryState::Found, *state);
    let info = info.as_ref().unwrap();
    assert_eq!("00:11:22:33:44:07", info.remote_address);
    assert_eq!(Some("Speaker".to_string()), info.remote_name);
    assert_eq!(-42, info.rssi);
    assert!(!info.is_bonded);

    // Conversion failure still reaches the callback, without a payload.
    assert_eq!((Ok(()), BtAdapterDeviceDiscoveryState::Found, None), seen[2]);
    assert_eq!((Ok(()), BtAdapterDeviceDiscoveryState::Finished, None), seen[3]);
}

#[test]
fn test_device_events() {
    let mut stack = TestStack::start(|_| {});

    let log = Arc::new(Mutex::new(vec![]));
    {
        let mut bluetooth = stack.bluetooth.lock().unwrap();

        let l = log.clone();
        bluetooth
            .device_set_bond_destroyed_cb(move |result, addr| {
                l.lock().unwrap().push(format!("destroyed {:?} {}", result, addr));
            })
            .unwrap();
        let l = log.clone();
        bluetooth
            .device_set_authorization_changed_cb(move |authorization, addr| {
                let authorized = authorization == BtDeviceAuthorization::Authorized;
                l.lock().unwrap().push(format!("authorized {} {}", authorized, addr));
            })
            .unwrap();
        let l = log.clone();
        bluetooth
            .device_set_connection_state_changed_cb(move |connected, addr| {
                l.lock().unwrap().push(format!("connected {} {}", connected, addr));
            })
            .unwrap();
    }

    stack.source.fire(BaseCallbacks::DeviceConnected(BtStatus::Success, PEER));
    stack.source.fire(BaseCallbacks::DeviceAuthorized(BtStatus::Success, PEER));
    stack.source.fire(BaseCallbacks::DeviceUnauthorized(BtStatus::Success, PEER));
    stack.source.fire(BaseCallbacks::BondedDeviceRemoved(BtStatus::Success, PEER));
    stack.source.fire(BaseCallbacks::DeviceDisconnected(BtStatus::Success, PEER));
    assert_eq!(5, stack.drain());

    assert_eq!(
        vec![
            "connected true 00:11:22:33:44:55",
            "authorized true 00:11:22:33:44:55",
            "authorized false 00:11:22:33:44:55",
            "destroyed Ok(()) 00:11:22:33:44:55",
            "connected false 00:11:22:33:44:55",
        ],
        *log.lock().unwrap()
    );
}

#[test]
fn test_service_searched() {
    let mut stack = TestStack::start(|_| {});

    let seen: Arc<Mutex<Vec<(Result<(), BtError>, Option<DeviceSdpInfo>)>>> =
        Arc::new(Mutex::new(vec![]));
    let seen_cb = seen.clone();
    stack
        .bluetooth
        .lock()
        .unwrap()
        .device_set_service_searched_cb(move |result, info| {
            seen_cb.lock().unwrap().push((result, info.cloned()));
        })
        .unwrap();

    let sdp = BtSdpInfo {
        device_addr: PEER,
        service_index: 2,
        uuids: vec![
            "00001101-0000-1000-8000-00805f9b34fb".into(),
            "0000111f-0000-1000-8000-00805f9b34fb".into(),
        ],
    };
    stack.source.fire(BaseCallbacks::ServiceSearched(BtStatus::Success, sdp));
    stack.source.fire(BaseCallbacks::ServiceSearched(
        BtStatus::ServiceSearchError,
        BtSdpInfo { device_addr: PEER, ..Default::default() },
    ));
    stack.drain();

    let seen = seen.lock().unwrap();
    let info = seen[0].1.as_ref().unwrap();
    assert_eq!("00:11:22:33:44:55", info.remote_address);
    assert_eq!(2, info.service_count());
    assert_eq!("0000111F-0000-1000-8000-00805F9B34FB", info.service_uuids[1]);

    assert_eq!(Err(BtError::ServiceSearchFailed), seen[1].0);
    assert_eq!(0, seen[1].1.as_ref().unwrap().service_count());
}

#[test]
fn test_rfcomm_events() {
    let mut stack = TestStack::start(|_| {});

    let states: Arc<Mutex<Vec<(BtSocketConnectionState, Option<SocketConnection>)>>> =
        Arc::new(Mutex::new(vec![]));
    let requests = Arc::new(Mutex::new(vec![]));
    let received = Arc::new(Mutex::new(vec![]));
    {
        let mut bluetooth = stack.bluetooth.lock().unwrap();

        let fd = bluetooth.socket_create_rfcomm("00001101-0000-1000-8000-00805F9B34FB").unwrap();
        assert_eq!(10, fd);
        bluetooth.socket_listen_rfcomm(fd, 1).unwrap();

        let s = states.clone();
        bluetooth
            .socket_set_connection_state_changed_cb(move |_, state, conn| {
                s.lock().unwrap().push((state, conn.cloned()));
            })
            .unwrap();
        let r = requests.clone();
        bluetooth
            .socket_set_connection_requested_cb(move |fd, addr| {
                r.lock().unwrap().push((fd, addr.to_string()));
            })
            .unwrap();
        let d = received.clone();
        bluetooth
            .socket_set_data_received_cb(move |data| {
                d.lock().unwrap().push((data.socket_fd, data.data.clone()));
            })
            .unwrap();
    }

    let conn = BtRfcommConnection {
        socket_fd: 11,
        device_role: BtSocketRole::Server,
        device_addr: PEER,
        uuid: "00001101-0000-1000-8000-00805F9B34FB".into(),
    };
    stack.source.fire(BaseCallbacks::RfcommConnectionRequested(
        BtStatus::Success,
        BtRfcommConnectionRequest { socket_fd: 10, device_addr: PEER },
    ));
    stack.source.fire(BaseCallbacks::RfcommConnected(BtStatus::Success, conn.clone()));
    stack.source.fire(BaseCallbacks::RfcommDataReceived(
        BtStatus::Success,
        BtRfcommReceivedData { socket_fd: 11, buffer: b"ping".to_vec() },
    ));
    stack.source.fire(BaseCallbacks::RfcommDisconnected(BtStatus::Success, conn));
    assert_eq!(4, stack.drain());

    assert_eq!(vec![(10, "00:11:22:33:44:55".to_string())], *requests.lock().unwrap());
    assert_eq!(vec![(11, b"ping".to_vec())], *received.lock().unwrap());

    let states = states.lock().unwrap();
    assert_eq!(2, states.len());
    assert_eq!(BtSocketConnectionState::Connected, states[0].0);
    assert_eq!(BtSocketConnectionState::Disconnected, states[1].0);
    let conn = states[0].1.as_ref().unwrap();
    assert_eq!(11, conn.socket_fd);
    assert_eq!(BtSocketRole::Server, conn.local_role);
    assert_eq!("00:11:22:33:44:55", conn.remote_address);
}

#[test]
fn test_accept_from_connection_requested_callback() {
    let mut stack = TestStack::start(|_| {});

    let weak = Arc::downgrade(&stack.bluetooth);
    let accepted = Arc::new(Mutex::new(vec![]));
    let accepted_cb = accepted.clone();
    stack
        .bluetooth
        .lock()
        .unwrap()
        .socket_set_connection_requested_cb(move |fd, _| {
            let bluetooth = weak.upgrade().unwrap();
            let mut bluetooth = bluetooth.lock().unwrap();
            accepted_cb.lock().unwrap().push(bluetooth.socket_accept(fd));
            // Re-registering from inside the callback is fine too.
            bluetooth.socket_unset_connection_requested_cb().unwrap();
        })
        .unwrap();

    stack.source.fire(BaseCallbacks::RfcommConnectionRequested(
        BtStatus::Success,
        BtRfcommConnectionRequest { socket_fd: 12, device_addr: PEER },
    ));
    stack.source.fire(BaseCallbacks::RfcommConnectionRequested(
        BtStatus::Success,
        BtRfcommConnectionRequest { socket_fd: 13, device_addr: PEER },
    ));
    assert_eq!(2, stack.drain());

    assert_eq!(vec![Ok(())], *accepted.lock().unwrap());
    assert_eq!(Some(MockInterfaceEvents::RfcommAcceptConnection(12)), stack.calls.try_recv().ok());
    assert!(stack.calls.try_recv().is_err());
}

#[test]
fn test_deinitialize_stops_delivery() {
    let mut stack = TestStack::start(|_| {});

    let count = Arc::new(Mutex::new(0));
    let count_cb = count.clone();
    {
        let mut bluetooth = stack.bluetooth.lock().unwrap();
        bluetooth
            .adapter_set_state_changed_cb(move |_, _| {
                *count_cb.lock().unwrap() += 1;
            })
            .unwrap();
        bluetooth.deinitialize().unwrap();
    }

    // The native stack lost its dispatcher.
    assert!(!stack.source.fire(BaseCallbacks::AdapterEnabled(BtStatus::Success)));
    assert_eq!(0, stack.drain());

    let mut bluetooth = stack.bluetooth.lock().unwrap();
    assert_eq!(Err(BtError::NotInitialized), bluetooth.adapter_enable());

    // Registrations do not survive deinitialize.
    bluetooth.initialize().unwrap();
    drop(bluetooth);
    stack.source.fire(BaseCallbacks::AdapterEnabled(BtStatus::Success));
    assert_eq!(1, stack.drain());
    assert_eq!(0, *count.lock().unwrap());
}

#[tokio::test]
async fn test_dispatch_loop_preserves_order() {
    let stack = TestStack::start(|_| {});
    let TestStack { bluetooth, source, rx, .. } = stack;

    let (seen_tx, mut seen_rx) = unbounded_channel();
    {
        let mut bt = bluetooth.lock().unwrap();
        let tx = seen_tx.clone();
        bt.adapter_set_state_changed_cb(move |_, state| {
            let _ = tx.send(format!("state {:?}", state));
        })
        .unwrap();
        let tx = seen_tx;
        bt.adapter_set_name_changed_cb(move |name| {
            let _ = tx.send(format!("name {}", name));
        })
        .unwrap();
    }

    tokio::spawn(Stack::dispatch(rx, bluetooth.clone()));

    source.fire(BaseCallbacks::AdapterEnabled(BtStatus::Success));
    source.fire(BaseCallbacks::LocalNameChanged(BtStatus::Success, "first".into()));
    source.fire(BaseCallbacks::AdapterDisabled(BtStatus::Success));
    source.fire(BaseCallbacks::LocalNameChanged(BtStatus::Success, "second".into()));

    let mut seen = vec![];
    for _ in 0..4 {
        seen.push(seen_rx.recv().await.unwrap());
    }

    assert_eq!(vec!["state Enabled", "name first", "state Disabled", "name second"], seen);
}
