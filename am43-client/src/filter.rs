//! Device identity filter
//!
//! A bridge serving several motors decides from configuration which addresses
//! it drives. The filter holds an allow list (empty means every device) and a
//! deny list that always wins. Addresses are stored upper-case and compared
//! without regard to case.

use am43_core::{Am43Error, Am43Result};
use once_cell::sync::Lazy;
use regex::Regex;

static MAC_ADDRESS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").ok());

/// Check that `address` looks like `AA:BB:CC:DD:EE:FF`
pub fn is_mac_address(address: &str) -> bool {
    MAC_ADDRESS
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}

fn normalize(address: &str) -> Am43Result<String> {
    let address = address.trim();
    if !is_mac_address(address) {
        return Err(Am43Error::InvalidConfig(format!(
            "invalid device address '{}'",
            address
        )));
    }
    Ok(address.to_ascii_uppercase())
}

fn parse_list(list: &str) -> Am43Result<Vec<String>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(normalize)
        .collect()
}

/// Allow/deny filter over device addresses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl DeviceFilter {
    /// Filter that admits every device
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from comma-separated allow and deny lists
    ///
    /// # Errors
    /// Returns `Am43Error::InvalidConfig` if an entry is not a MAC address
    pub fn from_lists(allow: &str, deny: &str) -> Am43Result<Self> {
        Ok(Self {
            allow: parse_list(allow)?,
            deny: parse_list(deny)?,
        })
    }

    pub fn allow(mut self, address: &str) -> Am43Result<Self> {
        self.allow.push(normalize(address)?);
        Ok(self)
    }

    pub fn deny(mut self, address: &str) -> Am43Result<Self> {
        self.deny.push(normalize(address)?);
        Ok(self)
    }

    /// Whether the device at `address` should be driven
    pub fn is_allowed(&self, address: &str) -> bool {
        let address = address.trim();
        if self.deny.iter().any(|d| d.eq_ignore_ascii_case(address)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|a| a.eq_ignore_ascii_case(address))
    }

    pub fn allow_list(&self) -> &[String] {
        &self.allow
    }

    pub fn deny_list(&self) -> &[String] {
        &self.deny
    }
}
