//! Event payloads carried by the bus.

use battle_core::{EffectKind, Stat};
use serde::{Deserialize, Serialize};

/// Well-known event names, as used for subscription.
pub mod names {
    pub const DOT_TICK: &str = "dot_tick";
    pub const HOT_TICK: &str = "hot_tick";
    pub const EFFECT_EXPIRED: &str = "effect_expired";
    pub const MODIFIER_APPLIED: &str = "modifier_applied";
    pub const MODIFIER_REMOVED: &str = "modifier_removed";
    pub const TURN_END: &str = "turn_end";
}

/// An event routed by name through the [`EventBus`](super::EventBus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A damage-over-time effect dealt its damage for the turn.
    DamageOverTimeTick(OverTimeTick),

    /// A heal-over-time effect applied its healing for the turn.
    HealingOverTimeTick(OverTimeTick),

    /// An effect ran out and was detached from its entity.
    EffectExpired {
        entity: String,
        effect: String,
        kind: EffectKind,
    },

    /// A stat modifier landed on its entity.
    ModifierApplied(ModifierChange),

    /// A stat modifier was reverted.
    ModifierRemoved(ModifierChange),

    /// An entity finished its effect tick for the turn.
    TurnEnd { entity: String, turn: u64 },

    /// Plugin-defined event with a free-form payload.
    Custom {
        name: String,
        data: serde_json::Value,
    },
}

impl Event {
    /// Name the event is dispatched under.
    pub fn name(&self) -> &str {
        match self {
            Event::DamageOverTimeTick(_) => names::DOT_TICK,
            Event::HealingOverTimeTick(_) => names::HOT_TICK,
            Event::EffectExpired { .. } => names::EFFECT_EXPIRED,
            Event::ModifierApplied(_) => names::MODIFIER_APPLIED,
            Event::ModifierRemoved(_) => names::MODIFIER_REMOVED,
            Event::TurnEnd { .. } => names::TURN_END,
            Event::Custom { name, .. } => name,
        }
    }

    pub fn custom(name: impl Into<String>, data: serde_json::Value) -> Self {
        Event::Custom {
            name: name.into(),
            data,
        }
    }
}

/// One DoT or HoT tick on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverTimeTick {
    pub entity: String,
    pub effect: String,
    pub name: String,
    /// Damage dealt or healing absorbed.
    pub amount: i64,
    /// Turns left after this tick; `-1` for permanent effects.
    pub remaining: i32,
    pub source: Option<String>,
}

/// Net stat change made (or reverted) by a modifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierChange {
    pub entity: String,
    pub effect: String,
    pub deltas: Vec<(Stat, f64)>,
}
