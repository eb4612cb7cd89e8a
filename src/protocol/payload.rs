// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON payloads exchanged with the server.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::types::DeviceId;

/// Body of a model or interval request.
///
/// ```json
/// {"mac":"AA:BB:CC:DD:EE:FF","last_model_update":"0001-01-01T00:00:00Z","initial":true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPayload {
    /// The requesting device.
    pub mac: DeviceId,
    /// When a model was last applied.
    pub last_model_update: DateTime<Utc>,
    /// `true` until the first model has been received.
    pub initial: bool,
}

/// Body of a send interval update pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPayload {
    /// Device the interval applies to.
    #[serde(default)]
    pub mac: String,
    /// New interval in minutes.
    #[serde(default)]
    pub send_interval: u64,
}

impl IntervalPayload {
    /// Parses the payload from raw message bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Json`] if the bytes are not a valid payload.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseError> {
        serde_json::from_slice(bytes).map_err(Into::into)
    }

    /// Converts the interval to a duration.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidInterval`] for zero or overflowing values.
    pub fn interval(&self) -> Result<Duration, ParseError> {
        if self.send_interval == 0 {
            return Err(ParseError::InvalidInterval(self.send_interval));
        }
        self.send_interval
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or(ParseError::InvalidInterval(self.send_interval))
    }
}

/// Timestamp reported before any model was applied: `0001-01-01T00:00:00Z`.
#[must_use]
pub fn never_updated() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_payload_shape() {
        let payload = RequestPayload {
            mac: DeviceId::new("AA:BB:CC:DD:EE:FF").unwrap(),
            last_model_update: never_updated(),
            initial: true,
        };

        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(json["last_model_update"], "0001-01-01T00:00:00Z");
        assert_eq!(json["initial"], true);
    }

    #[test]
    fn interval_payload_minutes() {
        let payload =
            IntervalPayload::from_slice(br#"{"mac":"AA:BB:CC:DD:EE:FF","send_interval":3}"#)
                .unwrap();
        assert_eq!(payload.interval().unwrap(), Duration::from_secs(180));
    }

    #[test]
    fn interval_payload_zero_is_invalid() {
        let payload = IntervalPayload::from_slice(br#"{"mac":"x","send_interval":0}"#).unwrap();
        assert!(matches!(
            payload.interval(),
            Err(ParseError::InvalidInterval(0))
        ));
    }

    #[test]
    fn interval_payload_overflow_is_invalid() {
        let payload = IntervalPayload {
            mac: String::new(),
            send_interval: u64::MAX,
        };
        assert!(payload.interval().is_err());
    }

    #[test]
    fn interval_payload_rejects_negative_and_garbage() {
        assert!(IntervalPayload::from_slice(br#"{"send_interval":-1}"#).is_err());
        assert!(IntervalPayload::from_slice(b"not json").is_err());
    }

    #[test]
    fn interval_payload_missing_fields_default() {
        let payload = IntervalPayload::from_slice(b"{}").unwrap();
        assert_eq!(payload.send_interval, 0);
        assert!(payload.mac.is_empty());
    }
}
