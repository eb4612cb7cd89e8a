// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The timer owner task.
//!
//! A single task consumes two control channels (`set` and `reset`) and is
//! the only writer of ticker, interval and gate state in the
//! [`DeviceRegistry`]. Senders are suspended until the owner has processed
//! their message, which serializes bursts of inbound updates.
//!
//! ```text
//!  handler ──TimerSet──┐
//!                      ├──► owner task ──► DeviceRegistry (write)
//!  caller ─TimerReset──┘                        ▲
//!                                               │ read / drain
//!  any task ──────────── can_send() ────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::types::{DeviceId, TimerKind};

use super::registry::DeviceRegistry;

/// Request to (re)arm a device's timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerSet {
    /// New period.
    pub duration: Duration,
    /// Which timer to set.
    pub kind: TimerKind,
    /// Target device.
    pub device: DeviceId,
}

impl TimerSet {
    /// Creates a send interval request.
    #[must_use]
    pub fn send_interval(device: DeviceId, duration: Duration) -> Self {
        Self {
            duration,
            kind: TimerKind::SendInterval,
            device,
        }
    }
}

/// A control message paired with its processing acknowledgement.
#[derive(Debug)]
struct Envelope<T> {
    message: T,
    done: oneshot::Sender<()>,
}

/// Sending side of the owner's control channels.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    set_tx: mpsc::Sender<Envelope<TimerSet>>,
    reset_tx: mpsc::Sender<Envelope<DeviceId>>,
}

impl TimerHandle {
    /// Sends a `TimerSet` and waits until the owner has applied it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerOwnerStopped`] if the owner is no longer running.
    pub async fn set(&self, timer: TimerSet) -> Result<(), Error> {
        deliver(&self.set_tx, timer).await
    }

    /// Sends a `TimerReset` and waits until the owner has applied it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerOwnerStopped`] if the owner is no longer running.
    pub async fn reset(&self, device: DeviceId) -> Result<(), Error> {
        deliver(&self.reset_tx, device).await
    }
}

async fn deliver<T>(tx: &mpsc::Sender<Envelope<T>>, message: T) -> Result<(), Error> {
    let (done, processed) = oneshot::channel();
    tx.send(Envelope { message, done })
        .await
        .map_err(|_| Error::TimerOwnerStopped)?;
    processed.await.map_err(|_| Error::TimerOwnerStopped)
}

/// Join handle and shutdown trigger of a running owner task.
#[derive(Debug)]
pub struct TimerOwnerTask {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl TimerOwnerTask {
    /// Stops the owner and waits for it to release every ticker.
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.join).await {
            tracing::warn!(error = %e, "Timer owner task ended abnormally");
        }
    }
}

/// Spawns the owner task for `registry`.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn_timer_owner(registry: Arc<DeviceRegistry>) -> (TimerHandle, TimerOwnerTask) {
    let (set_tx, set_rx) = mpsc::channel(1);
    let (reset_tx, reset_rx) = mpsc::channel(1);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let join = tokio::spawn(run_owner(registry, set_rx, reset_rx, shutdown_rx));

    (
        TimerHandle { set_tx, reset_tx },
        TimerOwnerTask {
            shutdown: Some(shutdown_tx),
            join,
        },
    )
}

/// Stops all tickers when the owner loop exits, whichever way it exits.
struct StopTickersOnExit(Arc<DeviceRegistry>);

impl Drop for StopTickersOnExit {
    fn drop(&mut self) {
        self.0.stop_all();
        tracing::debug!("Timer owner stopped all tickers");
    }
}

async fn run_owner(
    registry: Arc<DeviceRegistry>,
    mut set_rx: mpsc::Receiver<Envelope<TimerSet>>,
    mut reset_rx: mpsc::Receiver<Envelope<DeviceId>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let _guard = StopTickersOnExit(Arc::clone(&registry));
    tracing::debug!("Timer owner started");

    loop {
        tokio::select! {
            Some(envelope) = set_rx.recv() => {
                apply_set(&registry, &envelope.message);
                let _ = envelope.done.send(());
            }
            Some(envelope) = reset_rx.recv() => {
                apply_reset(&registry, &envelope.message);
                let _ = envelope.done.send(());
            }
            _ = &mut shutdown_rx => break,
            else => break,
        }
    }
}

fn apply_set(registry: &DeviceRegistry, timer: &TimerSet) {
    let device = &timer.device;
    tracing::debug!(
        device = %device,
        kind = timer.kind.as_str(),
        duration = ?timer.duration,
        "Received timer set event"
    );

    match timer.kind {
        TimerKind::SendInterval if timer.duration.is_zero() => {
            tracing::warn!(device = %device, "Ignoring zero send interval");
        }
        TimerKind::SendInterval => registry.arm(device, timer.duration),
        TimerKind::ReceiveInterval => {
            tracing::debug!(device = %device, "Receive interval timers are not managed");
        }
    }
}

fn apply_reset(registry: &DeviceRegistry, device: &DeviceId) {
    if registry.rearm(device) {
        tracing::debug!(device = %device, "Send timer restarted");
    } else {
        tracing::debug!(device = %device, "Ignoring reset for device without timer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn device() -> DeviceId {
        DeviceId::new("AA:BB:CC:DD:EE:FF").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn set_arms_closed_gate() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet::send_interval(device(), Duration::from_secs(10)))
            .await
            .unwrap();

        assert!(registry.has_timer(&device()));
        assert!(!registry.can_send(&device()));

        sleep(Duration::from_millis(10_001)).await;
        assert!(registry.can_send(&device()));
        assert!(!registry.can_send(&device()));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restarts_window() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet::send_interval(device(), Duration::from_secs(10)))
            .await
            .unwrap();
        sleep(Duration::from_secs(6)).await;
        handle.reset(device()).await.unwrap();

        sleep(Duration::from_secs(6)).await;
        assert!(!registry.can_send(&device()));

        sleep(Duration::from_secs(5)).await;
        assert!(registry.can_send(&device()));
        assert_eq!(
            registry.current_send_interval(&device()),
            Duration::from_secs(10)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn reset_without_timer_is_noop() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        handle.reset(device()).await.unwrap();

        assert!(!registry.has_timer(&device()));
        assert!(registry.can_send(&device()));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_ignored() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet::send_interval(device(), Duration::ZERO))
            .await
            .unwrap();

        assert!(!registry.has_timer(&device()));
    }

    #[tokio::test(start_paused = true)]
    async fn receive_interval_is_not_managed() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet {
                duration: Duration::from_secs(5),
                kind: TimerKind::ReceiveInterval,
                device: device(),
            })
            .await
            .unwrap();

        assert!(!registry.has_timer(&device()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_tickers_and_rejects_messages() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet::send_interval(device(), Duration::from_secs(1)))
            .await
            .unwrap();
        task.shutdown().await;

        sleep(Duration::from_secs(3)).await;
        assert!(!registry.can_send(&device()));

        let result = handle.reset(device()).await;
        assert!(matches!(result, Err(Error::TimerOwnerStopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_gate_with_pending_tick() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, task) = spawn_timer_owner(Arc::clone(&registry));

        handle
            .set(TimerSet::send_interval(device(), Duration::from_secs(1)))
            .await
            .unwrap();
        sleep(Duration::from_millis(1_500)).await;
        task.shutdown().await;

        assert!(!registry.can_send(&device()));
        sleep(Duration::from_secs(3)).await;
        assert!(!registry.can_send(&device()));
    }

    #[tokio::test(start_paused = true)]
    async fn messages_are_applied_in_order() {
        let registry = Arc::new(DeviceRegistry::new());
        let (handle, _task) = spawn_timer_owner(Arc::clone(&registry));

        for secs in [5, 20, 45] {
            handle
                .set(TimerSet::send_interval(device(), Duration::from_secs(secs)))
                .await
                .unwrap();
        }

        assert_eq!(
            registry.current_send_interval(&device()),
            Duration::from_secs(45)
        );
        assert_eq!(registry.device_count(), 1);
    }
}
