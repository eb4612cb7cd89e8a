// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Number of colon-separated groups in a MAC address.
const MAC_GROUPS: usize = 6;

/// MAC-address-shaped identifier of a connected device.
///
/// A valid identifier consists of exactly six colon-separated groups of two
/// hexadecimal digits, e.g. `AA:BB:CC:DD:EE:FF`. The original casing is kept
/// because it is echoed back in topics and payloads.
///
/// # Examples
///
/// ```
/// use hermes_lib::types::DeviceId;
///
/// let id: DeviceId = "AA:BB:CC:DD:EE:FF".parse().unwrap();
/// assert_eq!(id.as_str(), "AA:BB:CC:DD:EE:FF");
///
/// // Five groups is not a MAC address
/// assert!("AA:BB:CC:DD:EE".parse::<DeviceId>().is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a device identifier, validating the MAC address shape.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidDeviceId`] if `value` is not MAC-shaped.
    pub fn new(value: impl Into<String>) -> Result<Self, ParseError> {
        let value = value.into();
        if is_mac_shaped(&value) {
            Ok(Self(value))
        } else {
            Err(ParseError::InvalidDeviceId(value))
        }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returns `true` if `value` is six colon-separated two-hex-digit groups.
#[must_use]
pub fn is_mac_shaped(value: &str) -> bool {
    let mut groups = 0;
    for group in value.split(':') {
        groups += 1;
        if groups > MAC_GROUPS
            || group.len() != 2
            || !group.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return false;
        }
    }
    groups == MAC_GROUPS
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}
