// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adaptive state publishing.
//!
//! Every subsystem that changes something observable requests a state update
//! with an [`UpdateUrgency`]; the [`StateUpdateTimer`] coalesces those
//! requests and runs a single loop that emits one state message at or before
//! the nearest deadline, with the configured base period as the heartbeat
//! ceiling.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use vda5050_wire::{State, Visualization};

use crate::state::StateStore;
use crate::timer::{InterruptableTimer, SleepStatus};

/// The transport boundary: outgoing messages are handed over here.
///
/// Implementations are expected to hand the message to the wire (or an
/// internal send queue) before returning; an `Immediate` update blocks its
/// caller exactly until then.
pub trait MessageSink: Send + Sync {
    fn send_state(&self, state: State);
    fn send_visualization(&self, visualization: Visualization);
}

/// How soon the next state message must go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateUrgency {
    /// No update request.
    #[default]
    None,
    /// Within the next 10 seconds.
    Low,
    /// Within the next 1.5 seconds.
    Medium,
    /// Within the next 10 milliseconds.
    High,
    /// Right now; blocks until the state was handed to the transport.
    Immediate,
}

impl UpdateUrgency {
    /// Deadline for the update; `None` means no deadline at all.
    pub fn deadline(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Low => Some(Duration::from_secs(10)),
            Self::Medium => Some(Duration::from_millis(1500)),
            Self::High => Some(Duration::from_millis(10)),
            Self::Immediate => Some(Duration::ZERO),
        }
    }
}

struct Schedule {
    last_sent: Instant,
    next_scheduled: Option<Instant>,
}

struct Shared {
    timer: InterruptableTimer,
    schedule: Mutex<Schedule>,
    period: Duration,
    store: Arc<StateStore>,
    sink: Arc<dyn MessageSink>,
}

impl Shared {
    /// Snapshot the state, hand it to the transport, restart the heartbeat.
    fn emit(&self) {
        let state = self.store.next_state();
        self.sink.send_state(state);
        let mut schedule = self.schedule.lock();
        schedule.last_sent = Instant::now();
        schedule.next_scheduled = None;
    }
}

/// Owns the state-publishing loop.
pub struct StateUpdateTimer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StateUpdateTimer {
    /// Spawn the publishing loop. Must be called within a Tokio runtime.
    pub fn new(period: Duration, store: Arc<StateStore>, sink: Arc<dyn MessageSink>) -> Self {
        let shared = Arc::new(Shared {
            timer: InterruptableTimer::new(),
            schedule: Mutex::new(Schedule { last_sent: Instant::now(), next_scheduled: None }),
            period,
            store,
            sink,
        });
        let worker = tokio::spawn(run(Arc::clone(&shared)));
        Self { shared, worker: Mutex::new(Some(worker)) }
    }

    /// Request an update; the next emission may move closer.
    ///
    /// `Immediate` emits synchronously and returns once the transport has
    /// the message; all other urgencies only adjust the scheduled deadline
    /// and nudge the loop.
    pub fn request_update(&self, urgency: UpdateUrgency) {
        let Some(deadline) = urgency.deadline() else {
            return;
        };

        if urgency == UpdateUrgency::Immediate {
            self.shared.emit();
            self.shared.timer.interrupt();
            return;
        }

        let requested = Instant::now() + deadline;
        {
            let mut schedule = self.shared.schedule.lock();
            schedule.next_scheduled = Some(match schedule.next_scheduled {
                Some(existing) => existing.min(requested),
                None => requested,
            });
        }
        self.shared.timer.interrupt();
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shared.timer.disable();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

async fn run(shared: Arc<Shared>) {
    tracing::debug!("state update timer started");
    loop {
        let wakeup = {
            let schedule = shared.schedule.lock();
            let heartbeat = schedule.last_sent + shared.period;
            match schedule.next_scheduled {
                Some(requested) => heartbeat.min(requested),
                None => heartbeat,
            }
        };

        match shared.timer.sleep_until(wakeup).await {
            SleepStatus::Elapsed => shared.emit(),
            // A request moved the deadline; recompute and sleep again.
            SleepStatus::Interrupted => continue,
            SleepStatus::Disabled => break,
        }
    }
    tracing::debug!("state update timer exiting");
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod update_tests;
