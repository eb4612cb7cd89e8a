// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The coordinator context.
//!
//! A [`Coordinator`] owns every piece of per-process state: the device
//! registry and its timer owner task, the liveness tracker, model
//! bookkeeping and the inference engine handle. It is cheaply cloneable and
//! is handed to whichever component needs it, instead of living in a global.
//!
//! Inbound handling lives in `handlers`, outbound requests in `negotiator`.

mod handlers;
mod negotiator;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::config::CoordinatorConfig;
use crate::error::{InferenceError, Result};
use crate::inference::{EngineSlot, InferenceEngine};
use crate::liveness::LivenessTracker;
use crate::model_store::ModelStore;
use crate::protocol::payload::never_updated;
use crate::timer::{DeviceRegistry, TimerHandle, TimerOwnerTask, TimerSet, spawn_timer_owner};
use crate::types::DeviceId;

/// Model bookkeeping reported in outbound requests.
#[derive(Debug, Clone, Copy)]
struct ModelState {
    initial_model: bool,
    last_model_update: DateTime<Utc>,
}

/// Per-process coordinator for rate limiting, negotiation and liveness.
///
/// # Examples
///
/// ```no_run
/// use hermes_lib::{Coordinator, CoordinatorConfig, types::DeviceId};
///
/// # async fn example() -> hermes_lib::Result<()> {
/// let coordinator = Coordinator::builder()
///     .config(CoordinatorConfig::default().with_models_dir("./models"))
///     .build();
///
/// let device: DeviceId = "AA:BB:CC:DD:EE:FF".parse()?;
/// if coordinator.can_send(&device) {
///     // publish telemetry
/// }
///
/// coordinator.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    registry: Arc<DeviceRegistry>,
    timers: TimerHandle,
    owner: Mutex<Option<TimerOwnerTask>>,
    liveness: LivenessTracker,
    models: ModelStore,
    model_state: RwLock<ModelState>,
    engine: EngineSlot,
}

impl Coordinator {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    /// Creates a coordinator with the given configuration and no inference engine.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Returns the device registry.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    /// Returns whether `device` may publish now.
    ///
    /// See [`DeviceRegistry::can_send`].
    pub fn can_send(&self, device: &DeviceId) -> bool {
        self.inner.registry.can_send(device)
    }

    /// Returns the negotiated send interval of `device` (1 second if none).
    #[must_use]
    pub fn current_send_interval(&self, device: &DeviceId) -> Duration {
        self.inner.registry.current_send_interval(device)
    }

    /// Arms the send timer of `device` with `interval`.
    ///
    /// Waits until the timer owner has applied the change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerOwnerStopped`](crate::Error::TimerOwnerStopped)
    /// after shutdown.
    pub async fn set_send_interval(&self, device: DeviceId, interval: Duration) -> Result<()> {
        self.inner
            .timers
            .set(TimerSet::send_interval(device, interval))
            .await
    }

    /// Closes the gate of `device` and restarts its timer window.
    ///
    /// Devices without a timer are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerOwnerStopped`](crate::Error::TimerOwnerStopped)
    /// after shutdown.
    pub async fn reset_can_send(&self, device: DeviceId) -> Result<()> {
        self.inner.timers.reset(device).await
    }

    /// Returns `true` once the server has answered a ping.
    #[doc(alias = "is_connected_hades")]
    #[must_use]
    pub fn is_server_alive(&self) -> bool {
        self.inner.liveness.is_server_alive()
    }

    /// Returns when the server last answered a ping.
    #[must_use]
    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.inner.liveness.last_check()
    }

    /// Returns the liveness tracker.
    #[must_use]
    pub fn liveness(&self) -> &LivenessTracker {
        &self.inner.liveness
    }

    /// Returns `true` until the first model has been received.
    #[must_use]
    pub fn initial_model(&self) -> bool {
        self.inner.model_state.read().initial_model
    }

    /// Returns when a model was last received.
    #[must_use]
    pub fn last_model_update(&self) -> DateTime<Utc> {
        self.inner.model_state.read().last_model_update
    }

    /// Returns where received models are stored.
    #[must_use]
    pub fn model_store(&self) -> &ModelStore {
        &self.inner.models
    }

    /// Evaluates `features` with the inference engine.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Unavailable`] if no engine is loaded, or the
    /// engine's own error.
    pub fn infer(&self, features: &[f32]) -> Result<Vec<f32>> {
        self.inner.engine.evaluate(features).map_err(Into::into)
    }

    /// Returns `true` if an inference engine is loaded.
    #[must_use]
    pub fn has_inference_engine(&self) -> bool {
        self.inner.engine.is_loaded()
    }

    /// Stops the timer owner, every ticker, and releases the inference engine.
    ///
    /// Inbound dispatch must have stopped before calling this. Calling it
    /// again is a no-op.
    pub async fn shutdown(&self) {
        let owner = self.inner.owner.lock().take();
        if let Some(owner) = owner {
            owner.shutdown().await;
            tracing::debug!("Coordinator timer owner stopped");
        }
        self.inner.engine.release();
    }

    async fn send_timer(&self, timer: TimerSet) {
        let device = timer.device.clone();
        if let Err(e) = self.inner.timers.set(timer).await {
            tracing::warn!(device = %device, error = %e, "Failed to update send timer");
        }
    }

    fn update_model_state(&self, received_at: DateTime<Utc>) {
        let mut state = self.inner.model_state.write();
        state.initial_model = false;
        state.last_model_update = received_at;
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("devices", &self.inner.registry.device_count())
            .field("server_alive", &self.is_server_alive())
            .field("initial_model", &self.initial_model())
            .field("engine", &self.inner.engine)
            .finish_non_exhaustive()
    }
}

/// Loader invoked once when the coordinator is built.
type EngineLoader =
    Box<dyn FnOnce() -> std::result::Result<Box<dyn InferenceEngine>, InferenceError> + Send>;

/// Builder for a [`Coordinator`].
#[derive(Default)]
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    engine_loader: Option<EngineLoader>,
}

impl CoordinatorBuilder {
    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets an already loaded inference engine.
    #[must_use]
    pub fn inference_engine(self, engine: impl InferenceEngine + 'static) -> Self {
        self.inference_engine_with(move || Ok(Box::new(engine) as Box<dyn InferenceEngine>))
    }

    /// Sets a loader that acquires the inference engine during [`build`](Self::build).
    ///
    /// A failing loader is logged as critical; the coordinator still starts
    /// and [`Coordinator::infer`] reports the engine as unavailable.
    #[must_use]
    pub fn inference_engine_with<F>(mut self, loader: F) -> Self
    where
        F: FnOnce() -> std::result::Result<Box<dyn InferenceEngine>, InferenceError>
            + Send
            + 'static,
    {
        self.engine_loader = Some(Box::new(loader));
        self
    }

    /// Builds the coordinator and starts its timer owner task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> Coordinator {
        let engine = match self.engine_loader {
            Some(loader) => EngineSlot::from_load(loader()),
            None => EngineSlot::default(),
        };

        let registry = Arc::new(DeviceRegistry::new());
        let (timers, owner) = spawn_timer_owner(Arc::clone(&registry));
        let models = ModelStore::new(self.config.models_dir());

        tracing::debug!(
            models_dir = %self.config.models_dir().display(),
            engine_loaded = engine.is_loaded(),
            "Coordinator started"
        );

        Coordinator {
            inner: Arc::new(CoordinatorInner {
                config: self.config,
                registry,
                timers,
                owner: Mutex::new(Some(owner)),
                liveness: LivenessTracker::new(),
                models,
                model_state: RwLock::new(ModelState {
                    initial_model: true,
                    last_model_update: never_updated(),
                }),
                engine,
            }),
        }
    }
}

impl std::fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("config", &self.config)
            .field("engine_loader", &self.engine_loader.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use parking_lot::Mutex;

    use crate::error::ProtocolError;
    use crate::protocol::{MessagingClient, QoS};

    /// A published message captured by [`RecordingClient`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Published {
        pub topic: String,
        pub qos: QoS,
        pub retain: bool,
        pub payload: Vec<u8>,
    }

    /// Client that records publishes, optionally failing them.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingClient {
        pub published: Mutex<Vec<Published>>,
        pub fail: bool,
    }

    impl RecordingClient {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn topics(&self) -> Vec<String> {
            self.published.lock().iter().map(|p| p.topic.clone()).collect()
        }
    }

    impl MessagingClient for RecordingClient {
        async fn publish(
            &self,
            topic: &str,
            qos: QoS,
            retain: bool,
            payload: Vec<u8>,
        ) -> Result<(), ProtocolError> {
            if self.fail {
                return Err(ProtocolError::PublishFailed {
                    topic: topic.to_string(),
                    message: "broker unreachable".to_string(),
                });
            }
            self.published.lock().push(Published {
                topic: topic.to_string(),
                qos,
                retain,
                payload,
            });
            Ok(())
        }
    }
}
