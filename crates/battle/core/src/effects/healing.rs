use super::{EffectDuration, EffectState, EffectTick, TickStatus};
use crate::combatant::{Combatant, HealOptions};

/// Recurring healing applied once per turn. No inherent stack cap.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealingOverTime {
    pub name: String,
    pub id: String,
    pub healing: i64,
    pub turns: EffectDuration,
    pub source: Option<String>,
    /// Excess healing from this effect may become shields.
    pub allow_overheal: bool,
    state: EffectState,
}

impl HealingOverTime {
    /// `turns == -1` makes the effect permanent.
    pub fn new(name: impl Into<String>, id: impl Into<String>, healing: i64, turns: i32) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            healing,
            turns: EffectDuration::from_turns(turns),
            source: None,
            allow_overheal: false,
            state: EffectState::Active,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_overheal(mut self) -> Self {
        self.allow_overheal = true;
        self
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_expired(&self) -> bool {
        !self.state.is_live()
    }

    /// Applies this turn's healing and consumes one turn.
    pub fn tick(&mut self, target: &mut dyn Combatant) -> EffectTick {
        if !self.state.is_live() {
            return EffectTick {
                amount: 0,
                status: TickStatus::Expired,
            };
        }

        let options = HealOptions {
            allow_overheal: self.allow_overheal,
        };
        let amount = target.apply_healing(self.healing, self.source.as_deref(), options);
        let status = if self.turns.advance() {
            self.state = EffectState::Expired;
            TickStatus::Expired
        } else {
            TickStatus::Active
        };
        EffectTick { amount, status }
    }

    pub fn mark_removed(&mut self) {
        self.state = EffectState::Removed;
    }
}
