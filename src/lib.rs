// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `hermes` - per-device publish gating and model negotiation over MQTT.
//!
//! This library sits next to an MQTT client on an edge gateway and, for each
//! connected device:
//!
//! - **Rate limiting**: decides whether the device may publish right now
//! - **Model updates**: requests machine-learning models from the server and
//!   stores them when they arrive
//! - **Interval negotiation**: applies send intervals pushed by the server
//! - **Liveness**: pings the server and records its answers
//! - **Inference**: evaluates feature vectors with a pluggable engine
//!
//! # Architecture
//!
//! ```text
//!  inbound MQTT ──► Coordinator::dispatch ──► handlers ──TimerSet──► timer owner
//!                                                                       │ write
//!  any task ─────────────── Coordinator::can_send ────────────► DeviceRegistry
//!  any task ─── request_new_model / request_new_interval / ping ──► MessagingClient
//! ```
//!
//! A single timer owner task is the only writer of ticker state; everything
//! else reads the registry or sends it control messages.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use hermes_lib::{Coordinator, CoordinatorConfig};
//! use hermes_lib::protocol::MqttMessenger;
//!
//! #[tokio::main]
//! async fn main() -> hermes_lib::Result<()> {
//!     let coordinator = Coordinator::new(CoordinatorConfig::default());
//!
//!     let messenger = MqttMessenger::builder()
//!         .host("192.168.1.50")
//!         .build()
//!         .await?;
//!     messenger.attach(&coordinator).await?;
//!
//!     let device = "AA:BB:CC:DD:EE:FF".parse()?;
//!     coordinator.request_new_model(&messenger, &device).await?;
//!
//!     loop {
//!         if coordinator.can_send(&device) {
//!             // publish telemetry for the device
//!         }
//!         tokio::time::sleep(Duration::from_millis(500)).await;
//!     }
//! }
//! ```

mod config;
mod coordinator;
pub mod error;
pub mod inference;
pub mod liveness;
pub mod model_store;
pub mod protocol;
pub mod timer;
pub mod types;

pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{Error, InferenceError, ParseError, ProtocolError, Result};
pub use inference::InferenceEngine;
pub use protocol::{HandlerKind, InboundMessage, MessagingClient, QoS, TopicHandler};
#[cfg(feature = "mqtt")]
pub use protocol::{MqttMessenger, MqttMessengerBuilder};
pub use types::{DeviceId, TimerKind};
