// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inbound protocol handlers.
//!
//! ```text
//! hermes/node/+/+/hades/model/receive     → save model, arm warm-up interval
//! hermes/node/+/+/hades/interval/receive  → arm negotiated interval
//! hermes/node/+/+/hades/pong              → mark server alive
//! ```
//!
//! Malformed messages are logged and dropped; nothing here returns an error
//! to the transport.

use chrono::Utc;

use crate::error::Result;
use crate::protocol::payload::IntervalPayload;
use crate::protocol::topic::{INTERVAL_RECEIVE, MODEL_RECEIVE, PONG};
use crate::protocol::{HandlerKind, InboundMessage, MessagingClient, TopicHandler, parse_topic_mac};
use crate::timer::TimerSet;
use crate::types::DeviceId;

use super::Coordinator;

/// Inbound suffixes and the handler each one selects.
const INBOUND_ROUTES: [(&str, HandlerKind); 3] = [
    (MODEL_RECEIVE, HandlerKind::ModelReceived),
    (INTERVAL_RECEIVE, HandlerKind::IntervalReceived),
    (PONG, HandlerKind::PingResponse),
];

impl Coordinator {
    /// Returns the subscriptions the transport must hold, own prefix included.
    #[doc(alias = "get_handlers")]
    #[must_use]
    pub fn handlers(&self) -> Vec<TopicHandler> {
        let topics = self.config().topics();
        let qos = self.config().qos();

        INBOUND_ROUTES
            .into_iter()
            .map(|(suffix, kind)| TopicHandler {
                topic: topics.inbound(suffix),
                qos,
                kind,
            })
            .collect()
    }

    /// Routes an inbound message to the handler whose pattern matches its topic.
    ///
    /// Returns the handler that ran, or `None` if the topic is not ours.
    pub async fn dispatch(&self, message: &InboundMessage) -> Option<HandlerKind> {
        let topics = self.config().topics();
        let kind = INBOUND_ROUTES
            .into_iter()
            .find(|(suffix, _)| topics.matches_inbound(suffix, message.topic()))
            .map(|(_, kind)| kind);

        match kind {
            Some(HandlerKind::ModelReceived) => self.handle_model_received(message).await,
            Some(HandlerKind::IntervalReceived) => self.handle_interval_received(message).await,
            Some(HandlerKind::PingResponse) => self.handle_ping_response(),
            None => {
                tracing::trace!(topic = %message.topic(), "Ignoring unhandled topic");
            }
        }
        kind
    }

    /// Stores a delivered model and re-arms the device with the warm-up interval.
    ///
    /// The timer is re-armed even if the model could not be written.
    pub async fn handle_model_received(&self, message: &InboundMessage) {
        let Some(device) = parse_topic_mac(message.topic()) else {
            tracing::debug!(topic = %message.topic(), "Model received on topic without device id");
            return;
        };

        if let Err(e) = self.model_store().save(&device, message.payload()).await {
            tracing::error!(device = %device, error = %e, "Failed to save received model");
        }

        self.update_model_state(Utc::now());

        let warmup = self.config().model_warmup_interval();
        tracing::debug!(device = %device, interval = ?warmup, "Model received");
        self.send_timer(TimerSet::send_interval(device, warmup)).await;
    }

    /// Applies a send interval pushed by the server.
    ///
    /// The device is taken from the topic, falling back to the payload's
    /// `mac`. Zero intervals and unknown devices are dropped.
    pub async fn handle_interval_received(&self, message: &InboundMessage) {
        let payload = match IntervalPayload::from_slice(message.payload()) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    topic = %message.topic(),
                    error = %e,
                    "Failed to parse received interval"
                );
                return;
            }
        };

        let device =
            parse_topic_mac(message.topic()).or_else(|| DeviceId::new(payload.mac.as_str()).ok());
        let Some(device) = device else {
            tracing::warn!(topic = %message.topic(), "Received interval without device id");
            return;
        };

        let interval = match payload.interval() {
            Ok(interval) => interval,
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Received invalid send interval");
                return;
            }
        };

        tracing::info!(device = %device, interval = ?interval, "Received new send interval");
        self.send_timer(TimerSet::send_interval(device, interval)).await;
    }

    /// Records that the server answered a ping.
    pub fn handle_ping_response(&self) {
        self.liveness().record_pong(Utc::now());
        tracing::debug!("Server answered ping");
    }

    /// Counts a missed interval and requests a new one at the miss threshold.
    ///
    /// Returns `true` if a request was published.
    ///
    /// # Errors
    ///
    /// Returns the publish error if the interval request fails. The counter is
    /// already reset, so the next request follows after another full round.
    pub async fn check_need_new_interval<C: MessagingClient>(
        &self,
        client: &C,
        device: &DeviceId,
    ) -> Result<bool> {
        let threshold = self.config().miss_threshold();
        if !self.registry().record_miss(device, threshold) {
            return Ok(false);
        }

        tracing::debug!(device = %device, threshold, "Miss threshold reached, requesting interval");
        self.request_new_interval(client, device).await?;
        Ok(true)
    }
}
