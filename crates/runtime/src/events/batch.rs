//! Batched dispatch for high-frequency events.
//!
//! Each bus owns one [`BatchScheduler`]. Events published through
//! `publish_batched` are queued per event name; the first event queued after a
//! flush wakes a background task that sleeps for an interval chosen from the
//! backlog, snapshots and clears every queue, then dispatches the snapshot.
//! Events queued while a flush is running land in fresh queues and are picked
//! up by the next cycle.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Event;
use super::bus::BusInner;
use crate::sync::lock;

/// Pending events of one flush cycle, in first-queued order of event name.
pub(crate) type BatchSnapshot = Vec<(String, Vec<Event>)>;

#[derive(Debug, Default)]
struct BatchQueues {
    /// Event names in the order their queue was created this cycle.
    order: Vec<String>,
    queues: HashMap<String, Vec<Event>>,
    queued: usize,
}

#[derive(Debug)]
pub(crate) struct BatchScheduler {
    queues: Mutex<BatchQueues>,
    flush_pending: AtomicBool,
    wake: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl BatchScheduler {
    pub(crate) fn new() -> Self {
        Self {
            queues: Mutex::new(BatchQueues::default()),
            flush_pending: AtomicBool::new(false),
            wake: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        }
    }

    /// Queues `event`, waking the worker if no flush is pending yet.
    pub(crate) fn enqueue(&self, event: Event) {
        {
            let mut guard = lock(&self.queues);
            let batch = &mut *guard;
            let name = event.name();
            match batch.queues.get_mut(name) {
                Some(queue) => queue.push(event),
                None => {
                    let name = name.to_string();
                    batch.order.push(name.clone());
                    batch.queues.insert(name, vec![event]);
                }
            }
            batch.queued += 1;
        }

        if !self.flush_pending.swap(true, Ordering::AcqRel) {
            self.wake.notify_one();
        }
    }

    /// Total events waiting across all names.
    pub(crate) fn queued(&self) -> usize {
        lock(&self.queues).queued
    }

    /// Snapshots and clears every queue.
    pub(crate) fn drain(&self) -> BatchSnapshot {
        self.flush_pending.store(false, Ordering::Release);
        let BatchQueues {
            order, mut queues, ..
        } = mem::take(&mut *lock(&self.queues));

        order
            .into_iter()
            .filter_map(|name| queues.remove(&name).map(|events| (name, events)))
            .collect()
    }

    /// Starts the flush task on the current runtime unless one is running.
    pub(crate) fn ensure_worker(&self, bus: &Arc<BusInner>) {
        let mut worker = lock(&self.worker);
        if worker.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        debug!(target: "battle::events", "starting batch flush worker");
        let handle = tokio::spawn(run(Arc::downgrade(bus), Arc::clone(&self.wake)));
        *worker = Some(handle);
    }
}

impl Drop for BatchScheduler {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.worker).take() {
            handle.abort();
        }

        let queued = lock(&self.queues).queued;
        if queued > 0 {
            warn!(
                target: "battle::events",
                queued,
                "event bus dropped with batched events still queued"
            );
        }
    }
}

async fn run(bus: Weak<BusInner>, wake: Arc<Notify>) {
    loop {
        wake.notified().await;

        let interval = match bus.upgrade() {
            Some(inner) => inner.config.flush_interval_for(inner.batches.queued()),
            None => break,
        };
        tokio::time::sleep(interval).await;

        let Some(inner) = bus.upgrade() else {
            break;
        };
        inner.flush_batches().await;
    }
    debug!(target: "battle::events", "batch flush worker stopped");
}
