// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic layout of the negotiation protocol.
//!
//! ```text
//! Outbound (device → server):  hades/global/<mac>/model/request
//!                              hades/global/<mac>/interval/request
//!                              hades/global/<mac>/ping
//!
//! Inbound (server → device):   hermes/node/+/+/hades/model/receive
//!                              hermes/node/+/+/hades/interval/receive
//!                              hermes/node/+/+/hades/pong
//! ```
//!
//! The device identifier is found structurally: whichever segment has the
//! shape of a MAC address.

use crate::types::{DeviceId, is_mac_shaped};

/// Inbound suffix for model deliveries.
pub const MODEL_RECEIVE: &str = "node/+/+/hades/model/receive";
/// Inbound suffix for send interval updates.
pub const INTERVAL_RECEIVE: &str = "node/+/+/hades/interval/receive";
/// Inbound suffix for ping responses.
pub const PONG: &str = "node/+/+/hades/pong";

/// Extracts the MAC-shaped device identifier from a topic.
///
/// Returns `None` if no segment is exactly six two-hex-digit groups.
///
/// # Examples
///
/// ```
/// use hermes_lib::protocol::parse_topic_mac;
///
/// let id = parse_topic_mac("hermes/global/AA:BB:CC:DD:EE:FF/model/receive").unwrap();
/// assert_eq!(id.as_str(), "AA:BB:CC:DD:EE:FF");
///
/// assert!(parse_topic_mac("hermes/AA:BB:CC:DD:EE/global/send").is_none());
/// ```
#[must_use]
pub fn parse_topic_mac(topic: &str) -> Option<DeviceId> {
    topic
        .split('/')
        .find(|segment| is_mac_shaped(segment))
        .and_then(|segment| DeviceId::new(segment).ok())
}

/// Checks whether `topic` matches a subscription `pattern`.
///
/// `+` matches exactly one level, a trailing `#` matches any remainder.
#[must_use]
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return pattern_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(p), Some(t)) if p == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Builds the topics used by one coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicLayout {
    own_prefix: String,
    server_prefix: String,
}

impl TopicLayout {
    /// Creates a layout with the given own (inbound) and server (outbound) prefixes.
    #[must_use]
    pub fn new(own_prefix: impl Into<String>, server_prefix: impl Into<String>) -> Self {
        Self {
            own_prefix: own_prefix.into(),
            server_prefix: server_prefix.into(),
        }
    }

    /// Topic for requesting a new model.
    #[must_use]
    pub fn model_request(&self, device: &DeviceId) -> String {
        self.outbound(device, "model/request")
    }

    /// Topic for requesting a new send interval.
    #[must_use]
    pub fn interval_request(&self, device: &DeviceId) -> String {
        self.outbound(device, "interval/request")
    }

    /// Topic for pinging the server.
    #[must_use]
    pub fn ping(&self, device: &DeviceId) -> String {
        self.outbound(device, "ping")
    }

    /// Prepends the own prefix to an inbound suffix.
    #[must_use]
    pub fn inbound(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.own_prefix)
    }

    /// Checks whether `topic` matches `prefix/suffix` without building it.
    #[must_use]
    pub fn matches_inbound(&self, suffix: &str, topic: &str) -> bool {
        topic
            .strip_prefix(self.own_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .is_some_and(|rest| topic_matches(suffix, rest))
    }

    fn outbound(&self, device: &DeviceId, action: &str) -> String {
        format!("{}/global/{device}/{action}", self.server_prefix)
    }
}

impl Default for TopicLayout {
    fn default() -> Self {
        Self::new("hermes", "hades")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mac_from_topics() {
        let cases = [
            (
                "hermes/global/AA:BB:CC:DD:EE:FF/model/receive",
                Some("AA:BB:CC:DD:EE:FF"),
            ),
            (
                "hermes/AA:BB:CC:DD:EE:FF/global/receive/+",
                Some("AA:BB:CC:DD:EE:FF"),
            ),
            ("randomlongtext:randomverylongtext/global/send", None),
            ("hermes/AA:BB:CC:DD:EE/global/send", None),
            ("", None),
        ];

        for (topic, expected) in cases {
            let parsed = parse_topic_mac(topic);
            assert_eq!(
                parsed.as_ref().map(DeviceId::as_str),
                expected,
                "topic {topic:?}"
            );
        }
    }

    #[test]
    fn parse_mac_inside_wildcard_layout() {
        let parsed =
            parse_topic_mac("hermes/node/gateway-1/AA:BB:CC:DD:EE:FF/hades/model/receive").unwrap();
        assert_eq!(parsed.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn wildcard_matching() {
        let pattern = "hermes/node/+/+/hades/pong";
        assert!(topic_matches(pattern, "hermes/node/a/AA:BB:CC:DD:EE:FF/hades/pong"));
        assert!(!topic_matches(pattern, "hermes/node/a/hades/pong"));
        assert!(!topic_matches(pattern, "hermes/node/a/b/hades/pong/extra"));
        assert!(!topic_matches(pattern, "hermes/node/a/b/hades/ping"));
    }

    #[test]
    fn multi_level_wildcard() {
        assert!(topic_matches("hermes/#", "hermes/node/a/b"));
        assert!(topic_matches("hermes/#", "hermes"));
        assert!(!topic_matches("hermes/#", "hades/global"));
    }

    #[test]
    fn outbound_topics() {
        let layout = TopicLayout::default();
        let id = DeviceId::new("AA:BB:CC:DD:EE:FF").unwrap();

        assert_eq!(
            layout.model_request(&id),
            "hades/global/AA:BB:CC:DD:EE:FF/model/request"
        );
        assert_eq!(
            layout.interval_request(&id),
            "hades/global/AA:BB:CC:DD:EE:FF/interval/request"
        );
        assert_eq!(layout.ping(&id), "hades/global/AA:BB:CC:DD:EE:FF/ping");
    }

    #[test]
    fn inbound_topics() {
        let layout = TopicLayout::default();
        assert_eq!(
            layout.inbound(MODEL_RECEIVE),
            "hermes/node/+/+/hades/model/receive"
        );
    }

    #[test]
    fn inbound_matching_agrees_with_built_pattern() {
        let layout = TopicLayout::new("edge/hermes", "hades");
        let topics = [
            "edge/hermes/node/gw/AA:BB:CC:DD:EE:FF/hades/pong",
            "edge/hermes/node/gw/AA:BB:CC:DD:EE:FF/hades/pong/extra",
            "edge/hermesx/node/gw/AA:BB:CC:DD:EE:FF/hades/pong",
            "hermes/node/gw/AA:BB:CC:DD:EE:FF/hades/pong",
            "edge/hermes",
        ];

        for topic in topics {
            assert_eq!(
                layout.matches_inbound(PONG, topic),
                topic_matches(&layout.inbound(PONG), topic),
                "{topic}"
            );
        }
        assert!(layout.matches_inbound(PONG, topics[0]));
    }
}
