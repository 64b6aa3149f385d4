use super::{EffectDuration, EffectState, EffectTick, TickStatus};
use crate::combatant::Combatant;

/// Recurring damage applied once per turn.
///
/// Instances sharing an `id` are independent stacks: each ticks and expires
/// on its own schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageOverTime {
    pub name: String,
    pub id: String,
    pub damage: i64,
    pub turns: EffectDuration,
    pub source: Option<String>,
    state: EffectState,
}

impl DamageOverTime {
    /// `turns == -1` makes the effect permanent.
    pub fn new(name: impl Into<String>, id: impl Into<String>, damage: i64, turns: i32) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            damage,
            turns: EffectDuration::from_turns(turns),
            source: None,
            state: EffectState::Active,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        !self.state.is_live()
    }

    /// Deals this turn's damage and consumes one turn.
    pub fn tick(&mut self, target: &mut dyn Combatant) -> EffectTick {
        if !self.state.is_live() {
            return EffectTick {
                amount: 0,
                status: TickStatus::Expired,
            };
        }

        let amount = target.apply_damage(self.damage, self.source.as_deref());
        let status = if self.turns.advance() {
            self.state = EffectState::Expired;
            TickStatus::Expired
        } else {
            TickStatus::Active
        };
        EffectTick { amount, status }
    }

    /// Marks the effect terminal after it has been detached.
    pub fn mark_removed(&mut self) {
        self.state = EffectState::Removed;
    }
}
