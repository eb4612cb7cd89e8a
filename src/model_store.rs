// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! On-disk location of received models.

use std::path::{Path, PathBuf};

use crate::types::DeviceId;

/// Writes model bytes to `<dir>/model_<device>.tflite`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Creates a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the models directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a device's model is written to.
    #[must_use]
    pub fn model_path(&self, device: &DeviceId) -> PathBuf {
        self.dir.join(format!("model_{device}.tflite"))
    }

    /// Writes `model` as the device's current model, replacing any previous one.
    ///
    /// The models directory is created if missing.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the directory or file cannot be written.
    pub async fn save(&self, device: &DeviceId, model: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.model_path(device);
        tokio::fs::write(&path, model).await?;
        tracing::debug!(
            device = %device,
            path = %path.display(),
            bytes = model.len(),
            "Saved model"
        );
        Ok(path)
    }
}
