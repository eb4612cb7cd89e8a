// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-device rate-limiting state.
//!
//! The registry is readable from any thread. The arming operations are
//! crate-private: only the timer owner task calls them, which keeps ticker
//! creation and destruction single-threaded. [`DeviceRegistry::can_send`]
//! also mutates (it drains a pending tick) and therefore takes the write lock.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::types::DeviceId;

use super::ticker::Ticker;

/// Interval reported for devices without a timer.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Timer state of one device.
///
/// An entry only exists once the device's timer has been armed, so every
/// entry owns a ticker.
#[derive(Debug)]
struct DeviceTimer {
    send_interval: Duration,
    ticker: Ticker,
    can_send: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    timers: HashMap<DeviceId, DeviceTimer>,
    miss_counters: HashMap<DeviceId, u32>,
}

/// Registry of per-device send gates.
///
/// # Thread Safety
///
/// All state sits behind a single `parking_lot::RwLock`. Readers never
/// observe a partially re-armed device.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    state: RwLock<RegistryState>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `device` may publish now.
    ///
    /// Devices without a timer may always publish. Otherwise one pending
    /// tick is consumed: the gate opens if a tick was pending and closes if
    /// not. Two calls can never both consume the same tick.
    pub fn can_send(&self, device: &DeviceId) -> bool {
        let mut state = self.state.write();

        let Some(timer) = state.timers.get_mut(device) else {
            return true;
        };

        timer.can_send = timer.ticker.try_tick();
        timer.can_send
    }

    /// Returns the negotiated send interval, or [`DEFAULT_SEND_INTERVAL`].
    #[must_use]
    pub fn current_send_interval(&self, device: &DeviceId) -> Duration {
        self.state
            .read()
            .timers
            .get(device)
            .map_or(DEFAULT_SEND_INTERVAL, |timer| timer.send_interval)
    }

    /// Returns `true` if a timer has been armed for `device`.
    #[must_use]
    pub fn has_timer(&self, device: &DeviceId) -> bool {
        self.state.read().timers.contains_key(device)
    }

    /// Returns the number of devices with a timer.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.state.read().timers.len()
    }

    /// Returns the current miss counter of `device`.
    #[must_use]
    pub fn miss_count(&self, device: &DeviceId) -> u32 {
        self.state
            .read()
            .miss_counters
            .get(device)
            .copied()
            .unwrap_or(0)
    }

    /// Replaces the device's timer with a fresh one at `interval`.
    ///
    /// The gate starts closed and the miss counter is cleared.
    pub(crate) fn arm(&self, device: &DeviceId, interval: Duration) {
        let mut state = self.state.write();

        if let Some(previous) = state.timers.get_mut(device) {
            previous.ticker.stop();
        }

        state.timers.insert(
            device.clone(),
            DeviceTimer {
                send_interval: interval,
                ticker: Ticker::start(interval),
                can_send: false,
            },
        );
        state.miss_counters.remove(device);
    }

    /// Restarts the device's timer at its current interval.
    ///
    /// Returns `false` without touching anything if no timer exists.
    pub(crate) fn rearm(&self, device: &DeviceId) -> bool {
        let mut state = self.state.write();

        let Some(timer) = state.timers.get_mut(device) else {
            return false;
        };

        timer.can_send = false;
        timer.ticker.stop();
        timer.ticker = Ticker::start(timer.send_interval);
        true
    }

    /// Counts a missed interval for `device`.
    ///
    /// Returns `true` and resets the counter once it reaches `threshold`.
    pub(crate) fn record_miss(&self, device: &DeviceId, threshold: u32) -> bool {
        let mut state = self.state.write();
        let counter = state.miss_counters.entry(device.clone()).or_insert(0);

        *counter = counter.saturating_add(1);
        if *counter >= threshold {
            *counter = 0;
            true
        } else {
            false
        }
    }

    /// Stops every ticker. Entries are kept, their gates stay closed.
    pub(crate) fn stop_all(&self) {
        let mut state = self.state.write();
        for timer in state.timers.values_mut() {
            timer.ticker.stop();
            timer.can_send = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn device(last: u8) -> DeviceId {
        DeviceId::new(format!("AA:BB:CC:DD:EE:{last:02X}")).unwrap()
    }

    #[test]
    fn unknown_device_defaults() {
        let registry = DeviceRegistry::new();
        assert!(registry.can_send(&device(1)));
        assert_eq!(
            registry.current_send_interval(&device(1)),
            DEFAULT_SEND_INTERVAL
        );
        assert_eq!(registry.device_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_device_opens_once_per_tick() {
        let registry = DeviceRegistry::new();
        let id = device(1);

        registry.arm(&id, Duration::from_secs(10));
        assert!(!registry.can_send(&id));
        assert_eq!(registry.current_send_interval(&id), Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(10_001)).await;
        assert!(registry.can_send(&id));
        assert!(!registry.can_send(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn other_devices_stay_open() {
        let registry = DeviceRegistry::new();
        registry.arm(&device(1), Duration::from_secs(10));

        assert!(!registry.can_send(&device(1)));
        assert!(registry.can_send(&device(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_unknown_device_is_noop() {
        let registry = DeviceRegistry::new();
        assert!(!registry.rearm(&device(3)));
        assert!(!registry.has_timer(&device(3)));
        assert_eq!(registry.device_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn arm_replaces_previous_ticker() {
        let registry = DeviceRegistry::new();
        let id = device(1);

        registry.arm(&id, Duration::from_secs(1));
        registry.arm(&id, Duration::from_secs(60));
        assert_eq!(registry.device_count(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!registry.can_send(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_silences_tickers() {
        let registry = DeviceRegistry::new();
        let id = device(1);
        registry.arm(&id, Duration::from_secs(1));

        registry.stop_all();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!registry.can_send(&id));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_discards_pending_tick() {
        let registry = DeviceRegistry::new();
        let id = device(1);
        registry.arm(&id, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        registry.stop_all();

        assert!(!registry.can_send(&id));
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!registry.can_send(&id));
    }

    #[test]
    fn miss_counter_triggers_at_threshold() {
        let registry = DeviceRegistry::new();
        let id = device(4);

        assert!(!registry.record_miss(&id, 3));
        assert!(!registry.record_miss(&id, 3));
        assert_eq!(registry.miss_count(&id), 2);
        assert!(registry.record_miss(&id, 3));
        assert_eq!(registry.miss_count(&id), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn arm_clears_miss_counter() {
        let registry = DeviceRegistry::new();
        let id = device(4);

        registry.record_miss(&id, 10);
        registry.arm(&id, Duration::from_secs(1));
        assert_eq!(registry.miss_count(&id), 0);
    }

    #[test]
    fn concurrent_can_send_drains_tick_once() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let registry = Arc::new(DeviceRegistry::new());
        let id = device(5);

        runtime.block_on(async {
            registry.arm(&id, Duration::from_secs(1));
            tokio::time::sleep(Duration::from_millis(1_500)).await;
        });

        let opened = AtomicU32::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..16 {
                        if registry.can_send(&id) {
                            opened.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }
}
