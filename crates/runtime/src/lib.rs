//! Async orchestration for battle effects.
//!
//! This crate wires the pure effect types of `battle-core` into a running
//! battle: events are routed through a name-keyed bus, effects are ticked per
//! entity once a turn, and passive plugins are notified of each turn and of
//! what its effects did.
//!
//! Modules are organized by responsibility:
//! - [`battle`] hosts the shared battle context and its builder
//! - [`events`] provides the event bus with sync, async and batched dispatch
//! - [`effects`] owns per-entity effect lists and the turn tick
//! - [`passives`] defines the plugin interface and its registry
//! - [`config`] collects pacing, batching and fan-out tuning
pub mod battle;
pub mod combatant;
pub mod config;
pub mod effects;
pub mod error;
pub mod events;
pub mod passives;

mod sync;

pub use battle::{Battle, BattleBuilder};
pub use combatant::{SharedCombatant, lock_combatant, share};
pub use config::{BusConfig, EffectConfig, RuntimeConfig};
pub use effects::{EffectManager, TickReport};
pub use error::{HandlerError, HandlerResult, PassiveError, Result, RuntimeError};
pub use events::{
    Event, EventBus, EventMetrics, EventStats, Handler, MetricsSnapshot, ModifierChange,
    OverTimeTick, Owner, SubscriptionGuard, SubscriptionId, names,
};
pub use passives::{HookKind, Passive, PassiveHook, PassiveRegistry};
