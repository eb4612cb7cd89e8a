// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the coordinator.
//!
//! - [`DeviceId`] - MAC-shaped device identifier
//! - [`TimerKind`] - Which timer a control message targets

mod device_id;

pub use device_id::{DeviceId, is_mac_shaped};

/// Which per-device timer a `TimerSet` control message targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Minimum gap between permitted publishes.
    SendInterval,
    /// Reserved for a receive-side interval; currently not acted upon.
    ReceiveInterval,
}

impl TimerKind {
    /// Returns a short name used in log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendInterval => "send_interval",
            Self::ReceiveInterval => "receive_interval",
        }
    }
}
