// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Odometry service: position/velocity intake and the optional periodic
//! visualization publisher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::state::StateStore;
use crate::timer::{InterruptableTimer, SleepStatus};
use crate::update::MessageSink;

/// Owns the visualization loop. Position and velocity writes go straight to
/// the state store; this service only adds the periodic publishing on top.
pub struct Odometry {
    timer: Arc<InterruptableTimer>,
    worker: Mutex<Option<JoinHandle<()>>>,
    store: Arc<StateStore>,
    sink: Arc<dyn MessageSink>,
}

impl Odometry {
    pub(crate) fn new(store: Arc<StateStore>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            timer: Arc::new(InterruptableTimer::new()),
            worker: Mutex::new(None),
            store,
            sink,
        }
    }

    /// Start publishing a visualization message every `period`.
    ///
    /// A second enable restarts the loop with the new period.
    pub async fn enable_visualization(&self, period: Duration) {
        self.disable_visualization().await;
        self.timer.enable().await;

        let timer = Arc::clone(&self.timer);
        let store = Arc::clone(&self.store);
        let sink = Arc::clone(&self.sink);
        let worker = tokio::spawn(async move {
            tracing::debug!(?period, "visualization loop started");
            let mut wakeup = Instant::now() + period;
            loop {
                match timer.sleep_until(wakeup).await {
                    SleepStatus::Elapsed => {
                        sink.send_visualization(store.next_visualization());
                        wakeup += period;
                    }
                    SleepStatus::Interrupted => {}
                    SleepStatus::Disabled => break,
                }
            }
            tracing::debug!("visualization loop exiting");
        });
        *self.worker.lock() = Some(worker);
    }

    /// Stop the visualization loop and wait for it to exit. Idempotent.
    pub async fn disable_visualization(&self) {
        self.timer.disable();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
#[path = "odometry_tests.rs"]
mod odometry_tests;
