//! Name-keyed event bus implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::runtime::Handle;
use tracing::{error, trace, warn};

use super::batch::BatchScheduler;
use super::metrics::EventMetrics;
use super::pacing::Pacer;
use super::subscription::{Handler, Owner, Subscription, SubscriptionId};
use super::Event;
use crate::config::BusConfig;
use crate::error::HandlerResult;
use crate::sync::{read, write};

/// Process-wide publish/subscribe hub.
///
/// Subscribers register per event name. Every publish works from a defensive
/// copy of the subscriber list taken up front, so subscribing or
/// unsubscribing during a dispatch never affects the dispatch in progress.
/// Handler failures (errors and panics) are logged and counted, and never
/// reach the publisher.
///
/// Cloning the bus is cheap; clones share subscribers, queues and metrics.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

pub(crate) struct BusInner {
    pub(crate) config: BusConfig,
    subscribers: RwLock<HashMap<String, Vec<Subscription>>>,
    next_id: AtomicU64,
    metrics: EventMetrics,
    pacer: Pacer,
    pub(crate) batches: BatchScheduler,
}

impl EventBus {
    /// Creates a new event bus with default pacing and batching.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                metrics: EventMetrics::new(config.metrics_window),
                pacer: Pacer::new(&config),
                config,
                subscribers: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                batches: BatchScheduler::new(),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Registers `handler` for `event`.
    ///
    /// With an `owner`, the subscription lives only as long as the owner does.
    pub fn subscribe(
        &self,
        event: impl Into<String>,
        owner: Option<Owner>,
        handler: Handler,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let event = event.into();
        trace!(
            target: "battle::events",
            event = %event,
            handler = handler.label(),
            "subscribed"
        );
        write(&self.inner.subscribers)
            .entry(event)
            .or_default()
            .push(Subscription { id, owner, handler });
        id
    }

    /// Registers `handler` for as long as the returned guard is alive.
    pub fn subscribe_scoped(
        &self,
        event: impl Into<String>,
        handler: Handler,
    ) -> SubscriptionGuard {
        let event = event.into();
        let id = self.subscribe(event.clone(), None, handler);
        SubscriptionGuard {
            bus: Arc::downgrade(&self.inner),
            event,
            id,
        }
    }

    /// Removes every subscription to `event` held by `owner`.
    ///
    /// Returns how many were removed; zero if there were none.
    pub fn unsubscribe(&self, event: &str, owner: &Owner) -> usize {
        let mut subscribers = write(&self.inner.subscribers);
        let Some(list) = subscribers.get_mut(event) else {
            return 0;
        };
        let before = list.len();
        list.retain(|sub| !sub.owner.as_ref().is_some_and(|o| o.same_as(owner)));
        let removed = before - list.len();
        if list.is_empty() {
            subscribers.remove(event);
        }
        removed
    }

    /// Removes a single subscription by id.
    pub fn unsubscribe_id(&self, event: &str, id: SubscriptionId) -> bool {
        self.inner.remove_id(event, id)
    }

    /// Number of live subscribers to `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        read(&self.inner.subscribers)
            .get(event)
            .map_or(0, |list| list.iter().filter(|sub| sub.is_live()).count())
    }

    /// Dispatches `event` inline, in registration order.
    ///
    /// Async handlers are spawned as detached tasks on the current runtime.
    /// Without a runtime they cannot run and are logged as skipped.
    pub fn publish_sync(&self, event: Event) {
        let started = Instant::now();
        let name = event.name();
        let subscribers = self.inner.snapshot(name);
        let mut saw_dead = false;

        for sub in &subscribers {
            if !sub.is_live() {
                saw_dead = true;
                continue;
            }

            let handler_started = Instant::now();
            if let Some(result) = sub.handler.call_sync(&event) {
                self.inner
                    .finish(name, &sub.handler, handler_started.elapsed(), result);
                continue;
            }

            match Handle::try_current() {
                Ok(runtime) => {
                    let Some(future) = sub.handler.spawnable(event.clone()) else {
                        continue;
                    };
                    let inner = Arc::clone(&self.inner);
                    let handler = sub.handler.clone();
                    let name = name.to_string();
                    runtime.spawn(async move {
                        let started = Instant::now();
                        let result = future.await;
                        inner.finish(&name, &handler, started.elapsed(), result);
                    });
                }
                Err(_) => warn!(
                    target: "battle::events",
                    event = name,
                    handler = sub.handler.label(),
                    "no async runtime running, async handler could not be scheduled"
                ),
            }
        }

        if saw_dead {
            self.inner.prune(name);
        }
        self.inner.check_slow(name, started.elapsed());
    }

    /// Dispatches `event` to every handler concurrently and waits for all of them.
    pub async fn publish_async(&self, event: Event) {
        self.inner.dispatch(&event).await;
    }

    /// Queues `event` for the next batch flush.
    ///
    /// Without a running runtime there is nothing to flush on, so the event
    /// is dispatched synchronously instead.
    pub fn publish_batched(&self, event: Event) {
        if Handle::try_current().is_err() {
            warn!(
                target: "battle::events",
                event = event.name(),
                "no async runtime for batched publish, dispatching synchronously"
            );
            self.publish_sync(event);
            return;
        }

        self.inner.batches.enqueue(event);
        self.inner.batches.ensure_worker(&self.inner);
    }

    /// Drains and dispatches every pending batch now.
    pub async fn flush_batches(&self) {
        self.inner.flush_batches().await;
    }

    /// Events waiting for the next batch flush.
    pub fn pending_batched(&self) -> usize {
        self.inner.batches.queued()
    }

    pub fn metrics(&self) -> &EventMetrics {
        &self.inner.metrics
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &read(&self.inner.subscribers).len())
            .field("pending_batched", &self.pending_batched())
            .finish()
    }
}

impl BusInner {
    fn snapshot(&self, event: &str) -> Vec<Subscription> {
        read(&self.subscribers)
            .get(event)
            .cloned()
            .unwrap_or_default()
    }

    fn prune(&self, event: &str) {
        let mut subscribers = write(&self.subscribers);
        if let Some(list) = subscribers.get_mut(event) {
            let before = list.len();
            list.retain(Subscription::is_live);
            trace!(
                target: "battle::events",
                event,
                pruned = before - list.len(),
                "pruned dead subscribers"
            );
            if list.is_empty() {
                subscribers.remove(event);
            }
        }
    }

    fn remove_id(&self, event: &str, id: SubscriptionId) -> bool {
        let mut subscribers = write(&self.subscribers);
        let Some(list) = subscribers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|sub| sub.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(event);
        }
        removed
    }

    /// Records a handler outcome and logs failures.
    fn finish(&self, event: &str, handler: &Handler, elapsed: Duration, result: HandlerResult) {
        self.metrics.record(event, elapsed, result.is_err());
        if let Err(err) = result {
            error!(
                target: "battle::events",
                event,
                handler = handler.label(),
                error = %err,
                "event handler failed"
            );
        }
    }

    fn check_slow(&self, event: &str, elapsed: Duration) {
        if elapsed > self.config.slow_event_threshold {
            warn!(
                target: "battle::events",
                event,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow event"
            );
        }
    }

    /// Concurrent dispatch with per-handler isolation and pacing.
    pub(crate) async fn dispatch(&self, event: &Event) {
        let started = Instant::now();
        let name = event.name();
        let subscribers = self.snapshot(name);

        let (live, dead): (Vec<_>, Vec<_>) = subscribers.iter().partition(|sub| sub.is_live());
        if !dead.is_empty() {
            self.prune(name);
        }

        join_all(live.into_iter().map(|sub| async move {
            let handler_started = Instant::now();
            let result = sub.handler.call(event).await;
            let elapsed = handler_started.elapsed();
            self.finish(name, &sub.handler, elapsed, result);
            self.pacer.after(elapsed).await;
        }))
        .await;

        self.check_slow(name, started.elapsed());
    }

    pub(crate) async fn flush_batches(&self) {
        let snapshot = self.batches.drain();
        if snapshot.is_empty() {
            return;
        }

        let chunk_size = self.config.batch_chunk_size.max(1);
        join_all(snapshot.iter().map(|(_, events)| async move {
            for (index, chunk) in events.chunks(chunk_size).enumerate() {
                if index > 0 {
                    self.pacer.breathe().await;
                }
                for event in chunk {
                    self.dispatch(event).await;
                }
            }
        }))
        .await;
    }
}

/// Keeps a subscription alive; unsubscribes when dropped.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    bus: Weak<BusInner>,
    event: String,
    id: SubscriptionId,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove_id(&self.event, self.id);
        }
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}
