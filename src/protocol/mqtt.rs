// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! MQTT transport for the coordinator, built on `rumqttc`.
//!
//! # Examples
//!
//! ```no_run
//! use hermes_lib::{Coordinator, CoordinatorConfig};
//! use hermes_lib::protocol::MqttMessenger;
//!
//! # async fn example() -> hermes_lib::Result<()> {
//! let coordinator = Coordinator::new(CoordinatorConfig::default());
//!
//! let messenger = MqttMessenger::builder()
//!     .host("192.168.1.50")
//!     .credentials("devices", "secret")
//!     .build()
//!     .await?;
//!
//! // Subscribe to the coordinator's topics and start routing messages to it
//! messenger.attach(&coordinator).await?;
//!
//! let device = "AA:BB:CC:DD:EE:FF".parse()?;
//! coordinator.request_new_model(&messenger, &device).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, EventLoop, MqttOptions};
use tokio::sync::{RwLock, oneshot};

use crate::coordinator::Coordinator;
use crate::error::ProtocolError;
use crate::protocol::{InboundMessage, MessagingClient, QoS};

/// Global counter for generating unique client IDs.
static CLIENT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Configuration for an MQTT connection.
#[derive(Debug, Clone)]
pub(crate) struct MqttMessengerConfig {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    client_id: Option<String>,
    keep_alive: Duration,
    connection_timeout: Duration,
}

impl Default for MqttMessengerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            client_id: None,
            keep_alive: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// An MQTT connection that publishes for and feeds a [`Coordinator`].
///
/// Cheaply cloneable. Inbound publishes on topics the attached coordinator
/// subscribed to are dispatched on their own task each.
#[derive(Clone)]
pub struct MqttMessenger {
    inner: Arc<MqttMessengerInner>,
}

struct MqttMessengerInner {
    client: AsyncClient,
    config: MqttMessengerConfig,
    connected: AtomicBool,
    coordinator: RwLock<Option<Coordinator>>,
}

impl MqttMessenger {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> MqttMessengerBuilder {
        MqttMessengerBuilder::default()
    }

    /// Returns whether the connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.inner.config.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.config.port
    }

    /// Subscribes to the coordinator's handler topics and routes matching
    /// messages to it. Replaces a previously attached coordinator.
    ///
    /// # Errors
    ///
    /// Returns error if a subscription request fails.
    pub async fn attach(&self, coordinator: &Coordinator) -> Result<(), ProtocolError> {
        for handler in coordinator.handlers() {
            self.inner
                .client
                .subscribe(&handler.topic, handler.qos.into())
                .await
                .map_err(ProtocolError::Mqtt)?;
            tracing::debug!(topic = %handler.topic, "Subscribed to coordinator topic");
        }

        *self.inner.coordinator.write().await = Some(coordinator.clone());
        Ok(())
    }

    /// Unsubscribes from the attached coordinator's topics and stops routing.
    pub async fn detach(&self) {
        let Some(coordinator) = self.inner.coordinator.write().await.take() else {
            return;
        };

        for handler in coordinator.handlers() {
            if let Err(e) = self.inner.client.unsubscribe(&handler.topic).await {
                tracing::warn!(topic = %handler.topic, error = %e, "Failed to unsubscribe");
            }
        }
    }

    /// Disconnects from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request fails.
    pub async fn disconnect(&self) -> Result<(), ProtocolError> {
        tracing::info!(
            host = %self.inner.config.host,
            port = %self.inner.config.port,
            "Disconnecting from MQTT broker"
        );

        self.inner.coordinator.write().await.take();
        self.inner
            .client
            .disconnect()
            .await
            .map_err(ProtocolError::Mqtt)?;

        self.inner.connected.store(false, Ordering::Release);
        Ok(())
    }

    /// Hands an inbound message to the attached coordinator.
    async fn route_message(&self, message: InboundMessage) {
        let Some(coordinator) = self.inner.coordinator.read().await.clone() else {
            tracing::trace!(topic = %message.topic(), "No coordinator attached");
            return;
        };

        tokio::spawn(async move {
            coordinator.dispatch(&message).await;
        });
    }
}

impl MessagingClient for MqttMessenger {
    async fn publish(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        tracing::debug!(topic = %topic, bytes = payload.len(), "Publishing MQTT message");

        self.inner
            .client
            .publish(topic, qos.into(), retain, payload)
            .await
            .map_err(ProtocolError::Mqtt)
    }
}

impl std::fmt::Debug for MqttMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttMessenger")
            .field("host", &self.inner.config.host)
            .field("port", &self.inner.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Builder for an [`MqttMessenger`].
#[derive(Debug, Default)]
pub struct MqttMessengerBuilder {
    config: MqttMessengerConfig,
}

impl MqttMessengerBuilder {
    /// Sets the broker host address.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the MQTT client id (default: `hermes_<pid>_<n>`).
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.config.client_id = Some(id.into());
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.config.keep_alive = duration;
        self
    }

    /// Sets the connection timeout (default: 10 seconds).
    #[must_use]
    pub fn connection_timeout(mut self, duration: Duration) -> Self {
        self.config.connection_timeout = duration;
        self
    }

    /// Connects to the broker and waits for the connection acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Host is not set
    /// - Connection fails
    /// - Connection times out
    pub async fn build(self) -> Result<MqttMessenger, ProtocolError> {
        if self.config.host.is_empty() {
            return Err(ProtocolError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let client_id = self.config.client_id.clone().unwrap_or_else(|| {
            let counter = CLIENT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
            format!("hermes_{}_{}", std::process::id(), counter)
        });

        let mut mqtt_options = MqttOptions::new(&client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(self.config.keep_alive);
        mqtt_options.set_clean_session(true);

        if let Some((ref username, ref password)) = self.config.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        let messenger = MqttMessenger {
            inner: Arc::new(MqttMessengerInner {
                client,
                config: self.config.clone(),
                connected: AtomicBool::new(false),
                coordinator: RwLock::new(None),
            }),
        };

        let (connack_tx, connack_rx) = oneshot::channel();
        tokio::spawn(handle_events(event_loop, messenger.clone(), connack_tx));

        let timeout = self.config.connection_timeout;
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(())) => {
                tracing::info!(
                    host = %self.config.host,
                    port = %self.config.port,
                    client_id = %client_id,
                    "Connected to MQTT broker"
                );
                Ok(messenger)
            }
            Ok(Err(_)) => Err(ProtocolError::ConnectionFailed(
                "MQTT event loop terminated unexpectedly".to_string(),
            )),
            Err(_) => Err(ProtocolError::ConnectionFailed(format!(
                "MQTT connection timeout after {}s",
                timeout.as_secs()
            ))),
        }
    }
}

/// Drives the `rumqttc` event loop until the connection ends.
async fn handle_events(
    mut event_loop: EventLoop,
    messenger: MqttMessenger,
    connack_tx: oneshot::Sender<()>,
) {
    use rumqttc::{Event, Packet};

    let mut connack_tx = Some(connack_tx);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                tracing::debug!(?connack, "MQTT connected");
                messenger.inner.connected.store(true, Ordering::Release);
                if let Some(tx) = connack_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                tracing::debug!(
                    topic = %publish.topic,
                    bytes = publish.payload.len(),
                    "MQTT message received"
                );
                let message = InboundMessage::new(publish.topic, publish.payload.to_vec());
                messenger.route_message(message).await;
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker disconnected");
                messenger.inner.connected.store(false, Ordering::Release);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error");
                messenger.inner.connected.store(false, Ordering::Release);
                break;
            }
        }
    }
}
