// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device publish rate limiting.
//!
//! - [`DeviceRegistry`] - concurrent per-device gate state
//! - [`spawn_timer_owner`] - the single task allowed to re-arm timers
//! - [`TimerHandle`] - control channel senders (`TimerSet`, `TimerReset`)

mod owner;
mod registry;
mod ticker;

pub use owner::{TimerHandle, TimerOwnerTask, TimerSet, spawn_timer_owner};
pub use registry::{DEFAULT_SEND_INTERVAL, DeviceRegistry};
