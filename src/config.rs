// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Coordinator configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::protocol::{QoS, TopicLayout};

/// Configuration of a [`Coordinator`](crate::Coordinator).
///
/// # Examples
///
/// ```
/// use hermes_lib::CoordinatorConfig;
/// use std::time::Duration;
///
/// let config = CoordinatorConfig::default()
///     .with_models_dir("/var/lib/hermes/models")
///     .with_miss_threshold(3);
///
/// assert_eq!(config.model_warmup_interval(), Duration::from_secs(10));
/// assert_eq!(config.miss_threshold(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    topics: TopicLayout,
    models_dir: PathBuf,
    model_warmup_interval: Duration,
    miss_threshold: u32,
    qos: QoS,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            topics: TopicLayout::default(),
            models_dir: PathBuf::from("./models"),
            model_warmup_interval: Duration::from_secs(10),
            miss_threshold: 5,
            qos: QoS::AtLeastOnce,
        }
    }
}

impl CoordinatorConfig {
    /// Sets the own (inbound) and server (outbound) topic prefixes
    /// (default: `hermes` and `hades`).
    #[must_use]
    pub fn with_prefixes(
        mut self,
        own_prefix: impl Into<String>,
        server_prefix: impl Into<String>,
    ) -> Self {
        self.topics = TopicLayout::new(own_prefix, server_prefix);
        self
    }

    /// Sets the directory received models are written to (default: `./models`).
    #[must_use]
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Sets the send interval armed after a model is received (default: 10 seconds).
    #[must_use]
    pub fn with_model_warmup_interval(mut self, interval: Duration) -> Self {
        self.model_warmup_interval = interval;
        self
    }

    /// Sets how many missed intervals trigger a new interval request (default: 5).
    ///
    /// A threshold of zero is treated as one.
    #[must_use]
    pub fn with_miss_threshold(mut self, threshold: u32) -> Self {
        self.miss_threshold = threshold.max(1);
        self
    }

    /// Sets the QoS used for subscriptions and requests (default: at least once).
    #[must_use]
    pub fn with_qos(mut self, qos: QoS) -> Self {
        self.qos = qos;
        self
    }

    /// Returns the topic layout.
    #[must_use]
    pub fn topics(&self) -> &TopicLayout {
        &self.topics
    }

    /// Returns the models directory.
    #[must_use]
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Returns the send interval armed after a model is received.
    #[must_use]
    pub fn model_warmup_interval(&self) -> Duration {
        self.model_warmup_interval
    }

    /// Returns the miss threshold.
    #[must_use]
    pub fn miss_threshold(&self) -> u32 {
        self.miss_threshold
    }

    /// Returns the QoS used for subscriptions and requests.
    #[must_use]
    pub fn qos(&self) -> QoS {
        self.qos
    }
}
