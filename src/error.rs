// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `hermes` coordinator.
//!
//! Failures are split by origin: transport ([`ProtocolError`]), malformed
//! input ([`ParseError`]) and the inference collaborator ([`InferenceError`]).
//! Model persistence failures surface as [`Error::Storage`].

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred while talking to the messaging transport.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a topic or payload.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error reported by (or about) the inference engine.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    /// Writing a model to disk failed.
    #[error("model storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The timer owner task is no longer running.
    #[error("timer owner has stopped")]
    TimerOwnerStopped,
}

/// Errors related to the messaging transport.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// MQTT client request failed.
    #[cfg(feature = "mqtt")]
    #[error("MQTT error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// Connection to the broker failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Publishing a message failed.
    #[error("publish to {topic} failed: {message}")]
    PublishFailed {
        /// The topic the message was addressed to.
        topic: String,
        /// Description of the failure.
        message: String,
    },

    /// Invalid broker address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Internal channel was closed.
    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

/// Errors related to parsing topics and payloads.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A string is not a MAC-shaped device identifier.
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),

    /// A negotiated interval cannot be used.
    #[error("invalid send interval: {0} minutes")]
    InvalidInterval(u64),
}

/// Errors related to the inference engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// No engine is loaded (initialization failed or coordinator shut down).
    #[error("inference engine is unavailable")]
    Unavailable,

    /// The engine could not be loaded.
    #[error("failed to load inference engine: {0}")]
    LoadFailed(String),

    /// The engine rejected the input or failed during evaluation.
    #[error("evaluation failed: {0}")]
    EvaluationFailed(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
