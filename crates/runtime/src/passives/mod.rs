//! Passive plugin interface.
//!
//! Passives (character traits, relics, cards) are external plugins. The
//! runtime only notifies them: every notification is a [`PassiveHook`], a
//! closed enum with one typed payload per trigger kind, so a passive matches
//! on what it cares about instead of the runtime guessing call signatures.
//!
//! # Execution Order
//!
//! Passives are sorted by priority (lower values run first) when fewer than
//! the fan-out threshold handle a hook. Above it they run concurrently in
//! fixed-size batches, and ordering between them is not guaranteed.

mod registry;

pub use registry::PassiveRegistry;

use async_trait::async_trait;
use battle_core::EffectKind;

use crate::combatant::SharedCombatant;
use crate::error::PassiveError;

/// Trigger kinds a passive can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    TurnStart,
    TurnEnd,
    DamageTaken,
    HealReceived,
    EffectExpired,
}

/// A notification delivered to passives.
#[derive(Clone)]
pub enum PassiveHook {
    TurnStart(TurnContext),
    TurnEnd(TurnContext),
    DamageTaken(DamageTaken),
    HealReceived(HealReceived),
    EffectExpired(EffectExpired),
}

#[derive(Clone)]
pub struct TurnContext {
    pub entity: SharedCombatant,
    pub turn: u64,
}

#[derive(Clone)]
pub struct DamageTaken {
    pub entity: SharedCombatant,
    pub amount: i64,
    pub source: Option<String>,
}

#[derive(Clone)]
pub struct HealReceived {
    pub entity: SharedCombatant,
    pub amount: i64,
    pub source: Option<String>,
}

#[derive(Clone)]
pub struct EffectExpired {
    pub entity: SharedCombatant,
    pub effect: String,
    pub kind: EffectKind,
}

impl PassiveHook {
    pub fn kind(&self) -> HookKind {
        match self {
            Self::TurnStart(_) => HookKind::TurnStart,
            Self::TurnEnd(_) => HookKind::TurnEnd,
            Self::DamageTaken(_) => HookKind::DamageTaken,
            Self::HealReceived(_) => HookKind::HealReceived,
            Self::EffectExpired(_) => HookKind::EffectExpired,
        }
    }

    /// Entity the hook concerns.
    pub fn entity(&self) -> &SharedCombatant {
        match self {
            Self::TurnStart(ctx) | Self::TurnEnd(ctx) => &ctx.entity,
            Self::DamageTaken(hook) => &hook.entity,
            Self::HealReceived(hook) => &hook.entity,
            Self::EffectExpired(hook) => &hook.entity,
        }
    }
}

impl std::fmt::Debug for PassiveHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind: &'static str = self.kind().into();
        f.debug_tuple("PassiveHook").field(&kind).finish()
    }
}

/// A plugin reacting to battle hooks.
#[async_trait]
pub trait Passive: Send + Sync {
    /// Returns a human-readable identifier (used in logging).
    fn id(&self) -> &str;

    /// Hook kinds this passive wants to receive.
    fn hooks(&self) -> &[HookKind];

    /// Execution priority; lower values run first.
    fn priority(&self) -> i32 {
        0
    }

    async fn on_hook(&self, hook: &PassiveHook) -> Result<(), PassiveError>;
}
