// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Recurring per-device tick source.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A recurring timer that buffers at most one pending tick.
///
/// The first tick is produced one full period after the ticker starts.
/// Ticks produced while one is still pending are dropped, so a slow reader
/// sees at most one tick no matter how many periods went by.
///
/// Dropping the ticker stops it.
#[derive(Debug)]
pub(crate) struct Ticker {
    ticks: mpsc::Receiver<()>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Starts a ticker with the given period.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero or if called outside a Tokio runtime.
    pub(crate) fn start(period: Duration) -> Self {
        assert!(!period.is_zero(), "ticker period must be non-zero");

        let (tx, ticks) = mpsc::channel(1);
        let task = tokio::spawn(run_ticker(period, tx));

        Self { ticks, task }
    }

    /// Consumes a pending tick without waiting.
    ///
    /// Returns `true` if a tick was pending.
    pub(crate) fn try_tick(&mut self) -> bool {
        self.ticks.try_recv().is_ok()
    }

    /// Stops producing ticks and discards a pending one.
    pub(crate) fn stop(&mut self) {
        self.task.abort();
        self.ticks.close();
        while self.ticks.try_recv().is_ok() {}
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_ticker(period: Duration, tx: mpsc::Sender<()>) {
    // Periods past the clock's range never tick
    let Some(start) = Instant::now().checked_add(period) else {
        return;
    };
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => break,
        }
    }
}
