// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inference engine boundary.
//!
//! The coordinator does not know how a model is evaluated. It holds an
//! optional engine handle acquired at startup and released at shutdown.

use parking_lot::RwLock;

use crate::error::InferenceError;

/// Evaluates a feature vector against the current model.
pub trait InferenceEngine: Send + Sync {
    /// Returns the model's output vector for `features`.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::EvaluationFailed`] if evaluation fails.
    fn evaluate(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError>;
}

impl<F> InferenceEngine for F
where
    F: Fn(&[f32]) -> Result<Vec<f32>, InferenceError> + Send + Sync,
{
    fn evaluate(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        self(features)
    }
}

/// Holder of the engine handle.
#[derive(Default)]
pub(crate) struct EngineSlot {
    engine: RwLock<Option<Box<dyn InferenceEngine>>>,
}

impl EngineSlot {
    /// Stores the result of loading an engine.
    ///
    /// A load failure is logged and leaves the slot empty.
    pub(crate) fn from_load(
        loaded: Result<Box<dyn InferenceEngine>, InferenceError>,
    ) -> Self {
        let engine = match loaded {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::error!(error = %e, "CRITICAL: inference engine could not be initialized");
                None
            }
        };
        Self {
            engine: RwLock::new(engine),
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.engine.read().is_some()
    }

    pub(crate) fn evaluate(&self, features: &[f32]) -> Result<Vec<f32>, InferenceError> {
        let engine = self.engine.read();
        let engine = engine.as_ref().ok_or(InferenceError::Unavailable)?;
        engine.evaluate(features)
    }

    /// Drops the engine handle.
    pub(crate) fn release(&self) {
        if self.engine.write().take().is_some() {
            tracing::debug!("Released inference engine");
        }
    }
}

impl std::fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSlot")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
