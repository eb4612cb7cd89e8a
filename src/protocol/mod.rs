// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Messaging boundary of the coordinator.
//!
//! The coordinator does not own a transport. It publishes through any type
//! implementing [`MessagingClient`] and is fed inbound messages as
//! [`InboundMessage`] values. With the `mqtt` feature, [`MqttMessenger`]
//! provides both sides on top of `rumqttc`.
//!
//! The topic layout and JSON payloads of the negotiation protocol live in
//! [`topic`] and [`payload`].

#[cfg(feature = "mqtt")]
mod mqtt;
pub mod payload;
pub mod topic;

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttMessenger, MqttMessengerBuilder};
pub use payload::{IntervalPayload, RequestPayload};
pub use topic::{TopicLayout, parse_topic_mac, topic_matches};

use crate::error::ProtocolError;

/// Delivery guarantee requested for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QoS {
    /// Fire and forget (QoS 0).
    AtMostOnce,
    /// Acknowledged delivery (QoS 1).
    #[default]
    AtLeastOnce,
    /// Assured single delivery (QoS 2).
    ExactlyOnce,
}

impl QoS {
    /// Returns the numeric MQTT level.
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

#[cfg(feature = "mqtt")]
impl From<QoS> for rumqttc::QoS {
    fn from(qos: QoS) -> Self {
        match qos {
            QoS::AtMostOnce => Self::AtMostOnce,
            QoS::AtLeastOnce => Self::AtLeastOnce,
            QoS::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    topic: String,
    payload: Vec<u8>,
}

impl InboundMessage {
    /// Creates a message from its topic and raw payload.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns the topic the message arrived on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Outbound side of the messaging transport.
#[allow(async_fn_in_trait)]
pub trait MessagingClient {
    /// Publishes `payload` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError` if the transport rejects the message.
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError>;
}

/// Which protocol handler an inbound topic pattern is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// A model delivered by the server.
    ModelReceived,
    /// A new send interval pushed by the server.
    IntervalReceived,
    /// Response to a ping.
    PingResponse,
}

/// A subscription the transport must hold for the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHandler {
    /// Topic pattern, may contain `+` wildcards.
    pub topic: String,
    /// Requested subscription QoS.
    pub qos: QoS,
    /// Handler messages on this pattern are routed to.
    pub kind: HandlerKind,
}
