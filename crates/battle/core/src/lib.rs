//! Pure battle-effect rules shared by the runtime and offline tools.
//!
//! `battle-core` knows nothing about scheduling or events. It defines the
//! [`Combatant`] boundary, the closed [`Stat`] set, the
//! [`DiminishingReturns`] curve table, and the effect state machines
//! ([`DamageOverTime`], [`HealingOverTime`], [`StatModifier`]) that the
//! runtime's effect manager ticks once per turn.
pub mod combatant;
pub mod diminishing;
pub mod effects;
pub mod error;
pub mod stats;

pub use combatant::{Combatant, EffectIds, Fighter, HealOptions, get_current_stat_value};
pub use diminishing::{
    DiminishingCurve, DiminishingReturns, MIN_EFFECTIVENESS, calculate_diminishing_returns,
};
pub use effects::{
    DamageOverTime, Effect, EffectDuration, EffectKind, EffectState, EffectTick, HealingOverTime,
    ModifierApplication, StatModifier, TickStatus,
};
pub use error::{ConfigError, EffectError};
pub use stats::Stat;
