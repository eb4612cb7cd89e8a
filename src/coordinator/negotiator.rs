// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Outbound requests to the server.
//!
//! Requests are fire-and-forget: the answer, if any, arrives later on an
//! inbound topic. Requests carry no correlation id, so when several are in
//! flight for one device the last response applied wins.

use crate::error::{ParseError, Result};
use crate::protocol::MessagingClient;
use crate::protocol::payload::RequestPayload;
use crate::types::DeviceId;

use super::Coordinator;

impl Coordinator {
    /// Asks the server for a new model for `device`.
    ///
    /// # Errors
    ///
    /// Returns the publish error. Nothing is retried.
    pub async fn request_new_model<C: MessagingClient>(
        &self,
        client: &C,
        device: &DeviceId,
    ) -> Result<()> {
        let topic = self.config().topics().model_request(device);
        self.publish_request(client, device, &topic).await
    }

    /// Asks the server for a new send interval for `device`.
    ///
    /// # Errors
    ///
    /// Returns the publish error. Nothing is retried.
    pub async fn request_new_interval<C: MessagingClient>(
        &self,
        client: &C,
        device: &DeviceId,
    ) -> Result<()> {
        let topic = self.config().topics().interval_request(device);
        self.publish_request(client, device, &topic).await
    }

    /// Pings the server on behalf of `device`.
    ///
    /// Returns `true` if the ping was published. The answer is tracked by
    /// [`is_server_alive`](Self::is_server_alive).
    #[doc(alias = "ping_hades")]
    pub async fn ping_server<C: MessagingClient>(&self, client: &C, device: &DeviceId) -> bool {
        let topic = self.config().topics().ping(device);

        match client
            .publish(&topic, self.config().qos(), false, Vec::new())
            .await
        {
            Ok(()) => {
                tracing::debug!(device = %device, topic = %topic, "Pinged server");
                true
            }
            Err(e) => {
                tracing::warn!(device = %device, error = %e, "Ping to server failed");
                false
            }
        }
    }

    /// Builds the body shared by model and interval requests.
    #[must_use]
    pub fn request_payload(&self, device: &DeviceId) -> RequestPayload {
        RequestPayload {
            mac: device.clone(),
            last_model_update: self.last_model_update(),
            initial: self.initial_model(),
        }
    }

    async fn publish_request<C: MessagingClient>(
        &self,
        client: &C,
        device: &DeviceId,
        topic: &str,
    ) -> Result<()> {
        let payload = serde_json::to_vec(&self.request_payload(device)).map_err(ParseError::from)?;

        tracing::debug!(device = %device, topic = %topic, "Publishing request");
        if let Err(e) = client
            .publish(topic, self.config().qos(), false, payload)
            .await
        {
            tracing::warn!(device = %device, topic = %topic, error = %e, "Request has failed");
            return Err(e.into());
        }
        Ok(())
    }
}
