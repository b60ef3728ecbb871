//! Bluetooth C-API layer.
//!
//! This crate exposes the adapter, device, RFCOMM socket and HID host operations of the platform
//! Bluetooth API on top of a native stack reached through the `bt_topshim` interfaces. Native
//! events are posted to a channel, drained by `Stack::dispatch` and delivered to the callbacks
//! registered on the `Bluetooth` context.

pub mod bluetooth;
pub mod callbacks;
pub mod config;
pub mod converters;
pub mod error;
pub mod hid_host;
pub mod logging;
pub mod socket;
pub mod uuid;

use std::sync::{Arc, Mutex};

use bt_topshim::btif::{BaseCallbacks, BluetoothInterface};
use bt_topshim::profiles::hid_host::{HHCallbacks, HidHostInterface};
use bt_topshim::profiles::socket::RfcommInterface;
use log::{debug, error};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::bluetooth::Bluetooth;

/// Message types that are sent to the stack main dispatch loop.
#[derive(Debug)]
pub enum Message {
    Base(BaseCallbacks),
    HidHost(HHCallbacks),
}

/// Everything the API layer needs from the native stack.
pub trait BluetoothStack: BluetoothInterface + RfcommInterface + HidHostInterface + Send {}

impl<T: BluetoothInterface + RfcommInterface + HidHostInterface + Send> BluetoothStack for T {}

/// Umbrella class for the Bluetooth stack.
pub struct Stack {}

impl Stack {
    /// Creates an mpsc channel for passing messages to the main dispatch loop.
    ///
    /// The channel is unbounded so native callbacks never block on delivery.
    pub fn create_channel() -> (UnboundedSender<Message>, UnboundedReceiver<Message>) {
        unbounded_channel::<Message>()
    }

    /// Runs the main dispatch loop.
    ///
    /// Messages are handled one at a time, in the order they were posted. `bluetooth` owns a
    /// sender of `rx`, so the loop does not end on its own; abort its task to stop it.
    pub async fn dispatch(mut rx: UnboundedReceiver<Message>, bluetooth: Arc<Mutex<Bluetooth>>) {
        loop {
            let m = match rx.recv().await {
                Some(m) => m,
                None => {
                    debug!("Message dispatch loop quit");
                    break;
                }
            };

            Stack::deliver(&bluetooth, m);
        }
    }

    /// Handles one message, then runs the callbacks it triggered with `bluetooth` unlocked.
    pub fn deliver(bluetooth: &Arc<Mutex<Bluetooth>>, m: Message) {
        let pending = match bluetooth.lock() {
            Ok(mut bt) => {
                match m {
                    Message::Base(b) => {
                        bt.handle_base_callbacks(b);
                    }

                    Message::HidHost(h) => {
                        bt.handle_hid_host_callbacks(h);
                    }
                }
                bt.take_pending_callbacks()
            }
            Err(_) => {
                error!("Bluetooth context poisoned, dropping {:?}", m);
                return;
            }
        };

        for cb in pending {
            cb();
        }
    }
}
