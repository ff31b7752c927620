// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-consumer work queue for driver invocations.
//!
//! Handler entrypoints run here, FIFO on one dedicated blocking worker, so
//! driver code is decoupled from the engine's critical sections: the engine
//! finishes its own mutations first and only then enqueues the call. Jobs
//! are free to block.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue with a single blocking worker task.
pub struct TaskQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
}

impl TaskQueue {
    /// Create the queue and its worker. Must be called within a Tokio
    /// runtime. The returned handle joins once the queue was closed and the
    /// backlog drained.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::task::spawn_blocking(move || {
            while let Some(job) = rx.blocking_recv() {
                job();
            }
        });
        (Self { tx: Mutex::new(Some(tx)) }, worker)
    }

    /// Enqueue a job. Dropped with a log line when the queue is closed.
    pub fn push(&self, job: impl FnOnce() + Send + 'static) {
        let tx = self.tx.lock();
        match tx.as_ref() {
            Some(tx) if tx.send(Box::new(job)).is_ok() => {}
            _ => tracing::warn!("task queue closed, dropping job"),
        }
    }

    /// Stop accepting jobs. The worker exits after the backlog drained.
    pub fn close(&self) {
        self.tx.lock().take();
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tasks_tests;
