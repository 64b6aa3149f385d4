use std::collections::{BTreeMap, BTreeSet};

use super::{EffectDuration, EffectState, TickStatus};
use crate::combatant::Combatant;
use crate::diminishing::DiminishingReturns;
use crate::error::EffectError;
use crate::stats::Stat;

/// Temporary or permanent additive/multiplicative adjustment to derived stats.
///
/// The net delta per stat is computed once, in [`apply`](Self::apply), and
/// remembered so that [`remove`](Self::remove) reverts exactly what landed,
/// regardless of how the target's stats moved in between.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatModifier {
    pub name: String,
    pub id: String,
    pub turns: EffectDuration,
    /// Flat deltas, scaled by diminishing returns at the current value.
    pub deltas: BTreeMap<Stat, f64>,
    /// Multipliers, converted to a flat delta against the base value.
    pub multipliers: BTreeMap<Stat, f64>,
    /// Skip the diminishing-returns curve (account-level upgrades).
    pub bypass_diminishing: bool,
    /// Id of the combatant the deltas were applied to.
    target: Option<String>,
    applied: Option<BTreeMap<Stat, f64>>,
    /// Named stats that failed to parse; reported on the first `apply`.
    #[cfg_attr(feature = "serde", serde(skip))]
    rejected: Vec<EffectError>,
    state: EffectState,
}

/// What a call to [`StatModifier::apply`] did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModifierApplication {
    /// False when the modifier had already been applied or removed.
    pub changed: bool,
    /// Stat contributions that could not be applied.
    pub skipped: Vec<EffectError>,
}

impl StatModifier {
    /// `turns == -1` makes the modifier permanent.
    pub fn new(name: impl Into<String>, id: impl Into<String>, turns: i32) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            turns: EffectDuration::from_turns(turns),
            deltas: BTreeMap::new(),
            multipliers: BTreeMap::new(),
            bypass_diminishing: false,
            target: None,
            applied: None,
            rejected: Vec::new(),
            state: EffectState::Pending,
        }
    }

    #[must_use]
    pub fn with_delta(mut self, stat: Stat, value: f64) -> Self {
        *self.deltas.entry(stat).or_insert(0.0) += value;
        self
    }

    #[must_use]
    pub fn with_multiplier(mut self, stat: Stat, multiplier: f64) -> Self {
        self.multipliers.insert(stat, multiplier);
        self
    }

    /// Adds a delta by stat name. Unknown names are reported by `apply`.
    #[must_use]
    pub fn with_named_delta(self, name: &str, value: f64) -> Self {
        match Stat::parse(name) {
            Ok(stat) => self.with_delta(stat, value),
            Err(err) => self.reject(err),
        }
    }

    /// Adds a multiplier by stat name. Unknown names are reported by `apply`.
    #[must_use]
    pub fn with_named_multiplier(self, name: &str, multiplier: f64) -> Self {
        match Stat::parse(name) {
            Ok(stat) => self.with_multiplier(stat, multiplier),
            Err(err) => self.reject(err),
        }
    }

    #[must_use]
    pub fn bypass_diminishing(mut self) -> Self {
        self.bypass_diminishing = true;
        self
    }

    fn reject(mut self, err: EffectError) -> Self {
        self.rejected.push(err);
        self
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_applied(&self) -> bool {
        self.applied.is_some()
    }

    pub fn is_permanent(&self) -> bool {
        self.turns.is_permanent()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Net deltas currently applied to the target, per stat.
    pub fn applied_deltas(&self) -> Option<&BTreeMap<Stat, f64>> {
        self.applied.as_ref()
    }

    /// Applies the net delta of every stat to `entity`, once.
    pub fn apply(
        &mut self,
        entity: &mut dyn Combatant,
        table: &DiminishingReturns,
    ) -> ModifierApplication {
        if self.applied.is_some() || self.state == EffectState::Removed {
            return ModifierApplication::default();
        }

        let mut skipped = self.rejected.clone();
        let mut totals = BTreeMap::new();

        let stats: BTreeSet<Stat> = self
            .deltas
            .keys()
            .chain(self.multipliers.keys())
            .copied()
            .collect();

        for stat in stats {
            let Some(current) = entity.current_stat(stat) else {
                skipped.push(EffectError::UnsupportedStat {
                    entity: entity.id().to_string(),
                    stat,
                });
                continue;
            };

            let mut raw = self.deltas.get(&stat).copied().unwrap_or(0.0);
            if let Some(multiplier) = self.multipliers.get(&stat) {
                match entity.base_stat(stat) {
                    Some(base) => raw += base * (multiplier - 1.0),
                    None => skipped.push(EffectError::MissingBaseStat {
                        entity: entity.id().to_string(),
                        stat,
                    }),
                }
            }

            let factor = if self.bypass_diminishing {
                1.0
            } else {
                table.calculate(stat, current)
            };
            let total = raw * factor;
            if !total.is_finite() {
                skipped.push(EffectError::NonFiniteDelta { stat, value: total });
                continue;
            }

            match entity.adjust_stat(stat, total) {
                Ok(()) => {
                    totals.insert(stat, total);
                }
                Err(err) => skipped.push(err),
            }
        }

        self.target = Some(entity.id().to_string());
        self.applied = Some(totals);
        self.state = EffectState::Active;

        ModifierApplication {
            changed: true,
            skipped,
        }
    }

    /// Reverts whatever `apply` put on `entity`, once.
    ///
    /// Returns `Ok(false)` if there was nothing to revert. The modifier is
    /// terminal afterwards even when reverting one stat fails; the first such
    /// failure is returned after every other stat has been reverted.
    pub fn remove(&mut self, entity: &mut dyn Combatant) -> Result<bool, EffectError> {
        self.state = EffectState::Removed;
        let Some(applied) = self.applied.take() else {
            return Ok(false);
        };

        let mut first_error = None;
        for (stat, delta) in applied {
            if let Err(err) = entity.adjust_stat(stat, -delta) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(true),
        }
    }

    /// Consumes one turn, removing the modifier when it runs out.
    ///
    /// An `Err` means the modifier expired but reverting its deltas failed; it
    /// is terminal either way.
    pub fn tick(&mut self, entity: &mut dyn Combatant) -> Result<TickStatus, EffectError> {
        if !self.state.is_live() {
            return Ok(TickStatus::Expired);
        }
        if !self.turns.advance() {
            return Ok(TickStatus::Active);
        }

        self.state = EffectState::Expired;
        self.remove(entity)?;
        Ok(TickStatus::Expired)
    }
}
