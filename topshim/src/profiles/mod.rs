//! Various libraries to access the profile interfaces.

pub mod hid_host;
pub mod socket;
