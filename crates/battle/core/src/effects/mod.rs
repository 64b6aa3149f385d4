//! Turn-based effects and their lifecycle.
//!
//! Every effect walks the same state machine:
//!
//! ```text
//! Pending ─apply─▶ Active ─tick*─▶ Expired ─remove─▶ Removed
//!                    │                                  ▲
//!                    └──────────── remove / cleanup ────┘
//! ```
//!
//! Over-time effects start `Active`; stat modifiers start `Pending` until their
//! deltas land on the target. `Removed` is terminal and every later call on the
//! effect is a no-op.

mod damage;
mod duration;
mod healing;
mod modifier;

pub use damage::DamageOverTime;
pub use duration::EffectDuration;
pub use healing::HealingOverTime;
pub use modifier::{ModifierApplication, StatModifier};

/// Which collection an effect belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EffectKind {
    DamageOverTime,
    HealingOverTime,
    StatModifier,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectState {
    #[default]
    Pending,
    Active,
    Expired,
    Removed,
}

impl EffectState {
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }
}

/// Result of advancing an effect by one turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Active,
    Expired,
}

impl TickStatus {
    pub const fn is_expired(self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Outcome of one over-time tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectTick {
    /// Damage dealt or healing absorbed this tick.
    pub amount: i64,
    pub status: TickStatus,
}

/// Any effect a producer can hand to the effect manager.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    DamageOverTime(DamageOverTime),
    HealingOverTime(HealingOverTime),
    StatModifier(StatModifier),
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Self::DamageOverTime(_) => EffectKind::DamageOverTime,
            Self::HealingOverTime(_) => EffectKind::HealingOverTime,
            Self::StatModifier(_) => EffectKind::StatModifier,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::DamageOverTime(dot) => &dot.id,
            Self::HealingOverTime(hot) => &hot.id,
            Self::StatModifier(modifier) => &modifier.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DamageOverTime(dot) => &dot.name,
            Self::HealingOverTime(hot) => &hot.name,
            Self::StatModifier(modifier) => &modifier.name,
        }
    }
}

impl From<DamageOverTime> for Effect {
    fn from(effect: DamageOverTime) -> Self {
        Self::DamageOverTime(effect)
    }
}

impl From<HealingOverTime> for Effect {
    fn from(effect: HealingOverTime) -> Self {
        Self::HealingOverTime(effect)
    }
}

impl From<StatModifier> for Effect {
    fn from(effect: StatModifier) -> Self {
        Self::StatModifier(effect)
    }
}
