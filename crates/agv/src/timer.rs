// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interruptable sleep primitive.
//!
//! Each [`InterruptableTimer`] coordinates a group of sleepers: any number of
//! tasks may sleep on it, and another task may wake the whole group at once
//! with [`interrupt_all`](InterruptableTimer::interrupt_all) or shut it down
//! for good with [`disable`](InterruptableTimer::disable).  The periodic state
//! publisher and the visualization loop are both built on top of this.
//!
//! Internally two watch channels do the work: a terminate flag that wakes
//! sleepers, and a gauge counting the tasks currently inside a sleep call.
//! Waiting for the gauge to read zero is the clearance barrier that
//! `interrupt_all`, `enable` and shutdown rely on.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Outcome of a sleep call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepStatus {
    /// The sleep ran to its deadline.
    Elapsed,
    /// The sleep was cut short by `interrupt_all` or `disable`.
    Interrupted,
    /// The timer was disabled when the sleep was entered.
    Disabled,
}

/// A timer on which tasks can do interruptable sleeps.
pub struct InterruptableTimer {
    terminate: watch::Sender<bool>,
    wake: watch::Sender<u64>,
    sleepers: watch::Sender<usize>,
}

impl Default for InterruptableTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptableTimer {
    /// Create a new, enabled timer.
    pub fn new() -> Self {
        let (terminate, _) = watch::channel(false);
        let (wake, _) = watch::channel(0u64);
        let (sleepers, _) = watch::channel(0usize);
        Self { terminate, wake, sleepers }
    }

    /// Sleep for the given duration.
    pub async fn sleep_for(&self, duration: Duration) -> SleepStatus {
        self.sleep_until(Instant::now() + duration).await
    }

    /// Sleep until the given point in time.
    ///
    /// Returns [`SleepStatus::Disabled`] immediately when the timer is
    /// disabled at entry, without registering as a sleeper.
    pub async fn sleep_until(&self, deadline: Instant) -> SleepStatus {
        let mut terminate = self.terminate.subscribe();
        let mut wake = self.wake.subscribe();
        if *terminate.borrow_and_update() {
            return SleepStatus::Disabled;
        }
        wake.borrow_and_update();

        self.sleepers.send_modify(|n| *n += 1);
        // Decrements even when the future is dropped mid-sleep, so the
        // clearance barrier never waits on a sleeper that no longer exists.
        let _guard = SleeperGuard { gauge: &self.sleepers };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => SleepStatus::Elapsed,
            _ = terminate.wait_for(|t| *t) => SleepStatus::Interrupted,
            _ = wake.changed() => SleepStatus::Interrupted,
        }
    }

    /// Wake all current sleepers and block until each has acknowledged its
    /// exit, then re-enable the timer.
    pub async fn interrupt_all(&self) {
        self.disable();
        self.enable().await;
    }

    /// Wake all current sleepers without disabling the timer or waiting for
    /// them. New sleeps are unaffected.
    pub fn interrupt(&self) {
        self.wake.send_modify(|n| *n += 1);
    }

    /// Wake all current sleepers without waiting for them.
    ///
    /// Sleeps entered afterwards return [`SleepStatus::Disabled`] until
    /// [`enable`](Self::enable) is called. Idempotent.
    pub fn disable(&self) {
        self.terminate.send_replace(true);
    }

    /// Wait for clearance, then permit new sleeps again.
    pub async fn enable(&self) {
        self.wait_for_clearance().await;
        self.terminate.send_replace(false);
    }

    /// Resolve once no sleeper is active on this timer.
    pub async fn wait_for_clearance(&self) {
        let mut gauge = self.sleepers.subscribe();
        let _ = gauge.wait_for(|n| *n == 0).await;
    }

    /// Whether the timer currently rejects new sleeps.
    pub fn is_disabled(&self) -> bool {
        *self.terminate.borrow()
    }

    /// Number of tasks currently inside a sleep call.
    pub fn active_sleepers(&self) -> usize {
        *self.sleepers.borrow()
    }
}

struct SleeperGuard<'a> {
    gauge: &'a watch::Sender<usize>,
}

impl Drop for SleeperGuard<'_> {
    fn drop(&mut self) {
        self.gauge.send_modify(|n| *n = n.saturating_sub(1));
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod timer_tests;
