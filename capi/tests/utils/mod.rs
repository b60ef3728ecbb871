use std::sync::{Arc, Mutex};

use bt_capi::bluetooth::Bluetooth;
use bt_capi::config::TestConfig;
use bt_capi::{Message, Stack};
use bt_topshim::mocks::mock_bluetooth_interface::{
    MockBluetoothInterface, MockEventSource, MockInterfaceEvents,
};
use tokio::sync::mpsc::UnboundedReceiver;

const TEST_CONFIG: &str = "# Shared by every integration test.\nBT_LOG_LEVEL=debug\n";

/// An initialized `Bluetooth` context over the mock native stack.
pub struct TestStack {
    pub bluetooth: Arc<Mutex<Bluetooth>>,
    pub source: MockEventSource,
    pub calls: UnboundedReceiver<MockInterfaceEvents>,
    pub rx: UnboundedReceiver<Message>,
}

impl TestStack {
    /// Builds the context, letting `setup` prepare the mock first.
    pub fn start(setup: impl FnOnce(&mut MockBluetoothInterface)) -> TestStack {
        bt_capi::logging::init_logging_from_config(&TestConfig::from_string(TEST_CONFIG));

        let (mut mock, mut calls) = MockBluetoothInterface::new();
        setup(&mut mock);
        let source = mock.event_source();

        let (tx, rx) = Stack::create_channel();
        let mut bluetooth = Bluetooth::new(tx, Box::new(mock));
        bluetooth.initialize().unwrap();
        assert_eq!(Some(MockInterfaceEvents::RegisterCallback), calls.try_recv().ok());

        TestStack { bluetooth: Arc::new(Mutex::new(bluetooth)), source, calls, rx }
    }

    /// Delivers every posted message, in order, without running the dispatch loop.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(m) = self.rx.try_recv() {
            Stack::deliver(&self.bluetooth, m);
            delivered += 1;
        }
        delivered
    }
}
