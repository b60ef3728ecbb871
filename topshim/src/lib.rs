//! The boundary between the Bluetooth API layer and the native Bluetooth stack.
//!
//! Everything the native library hands over (status codes, addresses, event payloads) is
//! decoded into the types of this crate once, so the layers above only deal with Rust values.

pub mod btif;
pub mod mocks;
pub mod profiles;
