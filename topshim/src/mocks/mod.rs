//! Mocked native stack implementations for use in test.

pub mod mock_bluetooth_interface;
