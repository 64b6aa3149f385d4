//! The combatant boundary effects act upon.
//!
//! Entities are owned by the battle layer; effects only ever reach them through
//! [`Combatant`]. [`Fighter`] is the reference implementation used by the CLI
//! and by tests.

use std::collections::BTreeMap;

use crate::effects::EffectKind;
use crate::error::EffectError;
use crate::stats::Stat;

/// Scoped options threaded through a single healing call.
///
/// `allow_overheal` lets one heal push past max hp without flipping any
/// persistent flag on the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HealOptions {
    pub allow_overheal: bool,
}

impl HealOptions {
    pub const fn overheal() -> Self {
        Self {
            allow_overheal: true,
        }
    }
}

/// String ids of the live effects on an entity, kept for serialization.
///
/// These lists mirror the effect objects owned by the runtime's effect
/// manager one-to-one, including duplicate ids for stacked instances.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectIds {
    pub dots: Vec<String>,
    pub hots: Vec<String>,
    pub mods: Vec<String>,
}

impl EffectIds {
    pub fn list(&self, kind: EffectKind) -> &[String] {
        match kind {
            EffectKind::DamageOverTime => &self.dots,
            EffectKind::HealingOverTime => &self.hots,
            EffectKind::StatModifier => &self.mods,
        }
    }

    fn list_mut(&mut self, kind: EffectKind) -> &mut Vec<String> {
        match kind {
            EffectKind::DamageOverTime => &mut self.dots,
            EffectKind::HealingOverTime => &mut self.hots,
            EffectKind::StatModifier => &mut self.mods,
        }
    }

    pub fn push(&mut self, kind: EffectKind, id: impl Into<String>) {
        self.list_mut(kind).push(id.into());
    }

    /// Removes a single occurrence of `id`. Returns false if it was absent.
    pub fn remove_one(&mut self, kind: EffectKind, id: &str) -> bool {
        let list = self.list_mut(kind);
        match list.iter().position(|entry| entry == id) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.dots.clear();
        self.hots.clear();
        self.mods.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty() && self.hots.is_empty() && self.mods.is_empty()
    }
}

/// A live participant in battle, as seen by the effect system.
pub trait Combatant: Send {
    fn id(&self) -> &str;

    fn hp(&self) -> i64;

    fn max_hp(&self) -> i64;

    fn is_alive(&self) -> bool {
        self.hp() > 0
    }

    /// Unmodified value of `stat`, or `None` if this combatant lacks it.
    fn base_stat(&self, stat: Stat) -> Option<f64>;

    /// Value of `stat` with every active modifier folded in.
    fn current_stat(&self, stat: Stat) -> Option<f64>;

    /// Adds `delta` to the modifier total of `stat`.
    fn adjust_stat(&mut self, stat: Stat, delta: f64) -> Result<(), EffectError>;

    /// Deals `amount` damage and returns the hp actually lost.
    fn apply_damage(&mut self, amount: i64, source: Option<&str>) -> i64;

    /// Heals `amount` and returns the total absorbed (hp plus any overheal).
    fn apply_healing(&mut self, amount: i64, source: Option<&str>, options: HealOptions) -> i64;

    fn effect_ids(&self) -> &EffectIds;

    fn effect_ids_mut(&mut self) -> &mut EffectIds;
}

/// Returns the live value of `stat`, or `0.0` if the combatant lacks it.
pub fn get_current_stat_value(entity: &dyn Combatant, stat: Stat) -> f64 {
    entity.current_stat(stat).unwrap_or(0.0)
}

/// Reference combatant: a base stat table plus accumulated modifier deltas.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fighter {
    id: String,
    hp: i64,
    base: BTreeMap<Stat, f64>,
    bonus: BTreeMap<Stat, f64>,
    shields: i64,
    overheal_enabled: bool,
    effect_ids: EffectIds,
}

impl Fighter {
    /// Creates a fighter at full health carrying only `max_hp`.
    pub fn new(id: impl Into<String>, max_hp: i64) -> Self {
        let mut base = BTreeMap::new();
        base.insert(Stat::MaxHp, max_hp as f64);
        Self {
            id: id.into(),
            hp: max_hp,
            base,
            bonus: BTreeMap::new(),
            shields: 0,
            overheal_enabled: false,
            effect_ids: EffectIds::default(),
        }
    }

    /// Adds or replaces a base stat (builder pattern).
    #[must_use]
    pub fn with_stat(mut self, stat: Stat, value: f64) -> Self {
        self.base.insert(stat, value);
        if stat == Stat::MaxHp {
            self.hp = self.max_hp();
        }
        self
    }

    /// Overrides current hp, clamped to `[0, max_hp]` (builder pattern).
    #[must_use]
    pub fn with_hp(mut self, hp: i64) -> Self {
        self.hp = hp.clamp(0, self.max_hp());
        self
    }

    /// Standing overheal: excess healing always converts to shields.
    pub fn set_overheal_enabled(&mut self, enabled: bool) {
        self.overheal_enabled = enabled;
    }

    pub fn shields(&self) -> i64 {
        self.shields
    }

    /// Accumulated modifier delta on `stat`.
    pub fn bonus(&self, stat: Stat) -> f64 {
        self.bonus.get(&stat).copied().unwrap_or(0.0)
    }
}

impl Combatant for Fighter {
    fn id(&self) -> &str {
        &self.id
    }

    fn hp(&self) -> i64 {
        self.hp
    }

    fn max_hp(&self) -> i64 {
        self.current_stat(Stat::MaxHp)
            .map(|value| value.round().max(0.0) as i64)
            .unwrap_or(0)
    }

    fn base_stat(&self, stat: Stat) -> Option<f64> {
        self.base.get(&stat).copied()
    }

    fn current_stat(&self, stat: Stat) -> Option<f64> {
        self.base.get(&stat).map(|base| base + self.bonus(stat))
    }

    fn adjust_stat(&mut self, stat: Stat, delta: f64) -> Result<(), EffectError> {
        if !self.base.contains_key(&stat) {
            return Err(EffectError::UnsupportedStat {
                entity: self.id.clone(),
                stat,
            });
        }
        if !delta.is_finite() {
            return Err(EffectError::NonFiniteDelta { stat, value: delta });
        }

        *self.bonus.entry(stat).or_insert(0.0) += delta;

        if stat == Stat::MaxHp {
            self.hp = self.hp.min(self.max_hp());
        }
        Ok(())
    }

    fn apply_damage(&mut self, amount: i64, _source: Option<&str>) -> i64 {
        let mut remaining = amount.max(0);

        let absorbed = remaining.min(self.shields);
        self.shields -= absorbed;
        remaining -= absorbed;

        let lost = remaining.min(self.hp);
        self.hp -= lost;
        lost
    }

    fn apply_healing(&mut self, amount: i64, _source: Option<&str>, options: HealOptions) -> i64 {
        if self.hp <= 0 {
            return 0;
        }
        let amount = amount.max(0);
        let missing = (self.max_hp() - self.hp).max(0);
        let healed = amount.min(missing);
        self.hp += healed;

        let excess = amount - healed;
        if excess > 0 && (options.allow_overheal || self.overheal_enabled) {
            self.shields += excess;
            return amount;
        }
        healed
    }

    fn effect_ids(&self) -> &EffectIds {
        &self.effect_ids
    }

    fn effect_ids_mut(&mut self) -> &mut EffectIds {
        &mut self.effect_ids
    }
}
