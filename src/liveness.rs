// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server liveness as observed through ping responses.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;

#[derive(Debug, Default, Clone, Copy)]
struct LivenessState {
    server_alive: bool,
    last_check: Option<DateTime<Utc>>,
}

/// Tracks whether the server has answered a ping.
///
/// Guarded by its own lock so liveness updates never contend with the
/// device registry.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    state: RwLock<LivenessState>,
}

impl LivenessTracker {
    /// Creates a tracker that has not seen the server yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a ping response received at `now`.
    pub fn record_pong(&self, now: DateTime<Utc>) {
        let mut state = self.state.write();
        state.server_alive = true;
        state.last_check = Some(now);
    }

    /// Returns `true` once the server has answered a ping.
    #[must_use]
    pub fn is_server_alive(&self) -> bool {
        self.state.read().server_alive
    }

    /// Returns when the last ping response arrived.
    #[must_use]
    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_check
    }

    /// Returns `true` if the server answered within `max_age` of `now`.
    #[must_use]
    pub fn answered_within(&self, max_age: TimeDelta, now: DateTime<Utc>) -> bool {
        let state = *self.state.read();
        state.server_alive
            && state
                .last_check
                .is_some_and(|checked| now.signed_duration_since(checked) <= max_age)
    }
}
