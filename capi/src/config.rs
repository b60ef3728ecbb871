//! Test configuration shared with the conformance suites.
//!
//! The file holds `KEY=VALUE` lines; `#` starts a comment.

use bt_topshim::btif::RawAddress;
use configparser::ini::Ini;
use log::{info, warn, LevelFilter};
use std::str::FromStr;

use crate::converters::convert_address_to_hex;

pub const DEFAULT_CONFIG_PATH: &str = "/opt/home/capi-network-bluetooth/tetware.conf";

/// Keys outside any section land in this section.
const DEFAULT_SECTION: &str = "default";

const KEY_MOBILE_ADDRESS: &str = "BT_ADDR_MOBILE";
const KEY_LOG_LEVEL: &str = "BT_LOG_LEVEL";

pub struct TestConfig {
    conf: Ini,
}

impl TestConfig {
    fn new_ini() -> Ini {
        let mut conf = Ini::new_cs();
        conf.set_comment_symbols(&['#']);
        conf
    }

    /// Loads `path`, falling back to an empty configuration if it is missing or unreadable.
    pub fn load(path: &str) -> Self {
        let mut conf = Self::new_ini();
        if let Err(err) = conf.load(path) {
            info!("No test configuration loaded from {}: {}", path, err);
            conf = Self::new_ini();
        }
        TestConfig { conf }
    }

    /// Loads the configuration at `DEFAULT_CONFIG_PATH`.
    pub fn load_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH)
    }

    pub fn from_string(content: &str) -> Self {
        let mut conf = Self::new_ini();
        if let Err(err) = conf.read(content.to_string()) {
            warn!("Malformed test configuration: {}", err);
            conf = Self::new_ini();
        }
        TestConfig { conf }
    }

    /// Returns the value of `key`, if set and non-empty.
    pub fn get(&self, key: &str) -> Option<String> {
        self.conf.get(DEFAULT_SECTION, key).filter(|v| !v.is_empty())
    }

    /// Address of the peer device used by the tests.
    pub fn mobile_address(&self) -> Option<RawAddress> {
        self.get(KEY_MOBILE_ADDRESS).and_then(|addr| convert_address_to_hex(&addr).ok())
    }

    pub fn log_level(&self) -> Option<LevelFilter> {
        let level = self.get(KEY_LOG_LEVEL)?;
        match LevelFilter::from_str(&level) {
            Ok(level) => Some(level),
            Err(_) => {
                warn!("Ignoring unknown log level {:?}", level);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let conf = TestConfig::from_string(
            "# Peer used by the conformance suite\n\
             \n\
             BT_ADDR_MOBILE=00:11:22:aa:bb:cc\n\
             BT_LOG_LEVEL=debug\n",
        );

        assert_eq!(Some("00:11:22:aa:bb:cc".to_string()), conf.get("BT_ADDR_MOBILE"));
        assert_eq!(
            Some(RawAddress { address: [0x00, 0x11, 0x22, 0xaa, 0xbb, 0xcc] }),
            conf.mobile_address()
        );
        assert_eq!(Some(LevelFilter::Debug), conf.log_level());
        assert_eq!(None, conf.get("bt_addr_mobile"));
    }

    #[test]
    fn test_bad_values() {
        let conf = TestConfig::from_string("BT_ADDR_MOBILE=nope\nBT_LOG_LEVEL=loud\n");
        assert_eq!(None, conf.mobile_address());
        assert_eq!(None, conf.log_level());
    }

    #[test]
    fn test_missing_file() {
        let conf = TestConfig::load("/nonexistent/capi-network-bluetooth/tetware.conf");
        assert_eq!(None, conf.get("BT_ADDR_MOBILE"));
        assert_eq!(None, conf.mobile_address());
    }
}
