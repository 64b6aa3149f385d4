//! Name-keyed event bus for battle events.
//!
//! Producers publish [`Event`]s; subscribers register [`Handler`]s per event
//! name. Three dispatch modes are offered:
//!
//! - [`EventBus::publish_sync`] runs sync handlers inline and spawns async ones
//! - [`EventBus::publish_async`] awaits every handler concurrently
//! - [`EventBus::publish_batched`] queues high-frequency events for a paced,
//!   chunked flush on the bus's own background task
//!
//! Between handlers the bus paces itself cooperatively so a long chain of
//! callbacks never monopolizes the scheduler.

mod batch;
mod bus;
mod metrics;
mod pacing;
mod subscription;
mod types;

pub use bus::{EventBus, SubscriptionGuard};
pub use metrics::{EventMetrics, EventStats, MetricsSnapshot};
pub use subscription::{Handler, Owner, SubscriptionId};
pub use types::{Event, ModifierChange, OverTimeTick, names};
