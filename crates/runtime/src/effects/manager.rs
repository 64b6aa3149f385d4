//! Effect manager implementation.

use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use battle_core::{
    Combatant, DamageOverTime, DiminishingReturns, EffectKind, EffectTick, HealingOverTime,
    ModifierApplication, Stat, StatModifier, TickStatus,
};
use futures_util::future::join_all;
use tracing::{debug, error, trace, warn};

use super::TickReport;
use crate::combatant::{SharedCombatant, lock_combatant};
use crate::config::EffectConfig;
use crate::error::panic_message;
use crate::events::{Event, EventBus, ModifierChange, OverTimeTick};
use crate::passives::{self, PassiveHook, PassiveRegistry};

/// Owns every live effect on one entity and ticks them once per turn.
///
/// All mutation of the entity happens inside short synchronous sections;
/// the entity lock is never held across an `.await`.
pub struct EffectManager {
    entity: SharedCombatant,
    entity_id: String,
    dots: Vec<DamageOverTime>,
    hots: Vec<HealingOverTime>,
    mods: Vec<StatModifier>,
    bus: EventBus,
    passives: Arc<PassiveRegistry>,
    diminishing: Arc<DiminishingReturns>,
    config: EffectConfig,
    turn: u64,
}

/// Outcome of ticking a single over-time effect.
enum OverTimeOutcome {
    /// The entity was down when the effect came up.
    Skipped,
    Ticked(EffectTick),
}

/// Shared shape of damage-over-time and heal-over-time effects.
trait OverTime: Send {
    const KIND: EffectKind;

    fn effect_id(&self) -> &str;

    fn tick_on(&mut self, target: &mut dyn Combatant) -> EffectTick;

    fn tick_event(&self, entity: &str, amount: i64) -> Event;

    /// Hook telling passives what the tick did to `entity`.
    fn passive_hook(&self, entity: &SharedCombatant, amount: i64) -> PassiveHook;

    fn mark_removed(&mut self);
}

impl OverTime for DamageOverTime {
    const KIND: EffectKind = EffectKind::DamageOverTime;

    fn effect_id(&self) -> &str {
        &self.id
    }

    fn tick_on(&mut self, target: &mut dyn Combatant) -> EffectTick {
        self.tick(target)
    }

    fn tick_event(&self, entity: &str, amount: i64) -> Event {
        Event::DamageOverTimeTick(OverTimeTick {
            entity: entity.to_string(),
            effect: self.id.clone(),
            name: self.name.clone(),
            amount,
            remaining: self.turns.into(),
            source: self.source.clone(),
        })
    }

    fn passive_hook(&self, entity: &SharedCombatant, amount: i64) -> PassiveHook {
        PassiveHook::DamageTaken(passives::DamageTaken {
            entity: Arc::clone(entity),
            amount,
            source: self.source.clone(),
        })
    }

    fn mark_removed(&mut self) {
        DamageOverTime::mark_removed(self);
    }
}

impl OverTime for HealingOverTime {
    const KIND: EffectKind = EffectKind::HealingOverTime;

    fn effect_id(&self) -> &str {
        &self.id
    }

    fn tick_on(&mut self, target: &mut dyn Combatant) -> EffectTick {
        self.tick(target)
    }

    fn tick_event(&self, entity: &str, amount: i64) -> Event {
        Event::HealingOverTimeTick(OverTimeTick {
            entity: entity.to_string(),
            effect: self.id.clone(),
            name: self.name.clone(),
            amount,
            remaining: self.turns.into(),
            source: self.source.clone(),
        })
    }

    fn passive_hook(&self, entity: &SharedCombatant, amount: i64) -> PassiveHook {
        PassiveHook::HealReceived(passives::HealReceived {
            entity: Arc::clone(entity),
            amount,
            source: self.source.clone(),
        })
    }

    fn mark_removed(&mut self) {
        HealingOverTime::mark_removed(self);
    }
}

impl EffectManager {
    pub fn new(
        entity: SharedCombatant,
        bus: EventBus,
        passives: Arc<PassiveRegistry>,
        diminishing: Arc<DiminishingReturns>,
        config: EffectConfig,
    ) -> Self {
        let entity_id = lock_combatant(&entity).id().to_string();
        Self {
            entity,
            entity_id,
            dots: Vec::new(),
            hots: Vec::new(),
            mods: Vec::new(),
            bus,
            passives,
            diminishing,
            config,
            turn: 0,
        }
    }

    pub fn entity(&self) -> &SharedCombatant {
        &self.entity
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn dots(&self) -> &[DamageOverTime] {
        &self.dots
    }

    pub fn hots(&self) -> &[HealingOverTime] {
        &self.hots
    }

    pub fn modifiers(&self) -> &[StatModifier] {
        &self.mods
    }

    /// Number of completed ticks.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn effect_count(&self) -> usize {
        self.dots.len() + self.hots.len() + self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effect_count() == 0
    }

    /// Attaches a damage-over-time instance.
    ///
    /// Rejected when the entity is dead, or when `max_stacks` live instances
    /// with the same id already exist (the existing ones are not refreshed).
    pub fn add_dot(&mut self, dot: DamageOverTime, max_stacks: Option<usize>) -> bool {
        let mut entity = lock_combatant(&self.entity);
        if !entity.is_alive() {
            debug!(
                target: "battle::effects",
                entity = %self.entity_id,
                effect = %dot.id,
                "rejected DoT on dead entity"
            );
            return false;
        }

        if let Some(cap) = max_stacks {
            let stacks = self
                .dots
                .iter()
                .filter(|existing| existing.id == dot.id && !existing.is_expired())
                .count();
            if stacks >= cap {
                debug!(
                    target: "battle::effects",
                    entity = %self.entity_id,
                    effect = %dot.id,
                    stacks,
                    "DoT stack cap reached"
                );
                return false;
            }
        }

        entity
            .effect_ids_mut()
            .push(EffectKind::DamageOverTime, dot.id.clone());
        trace!(target: "battle::effects", entity = %self.entity_id, effect = %dot.id, "added DoT");
        self.dots.push(dot);
        true
    }

    /// Attaches a heal-over-time instance unless the entity is dead.
    pub fn add_hot(&mut self, hot: HealingOverTime) -> bool {
        let mut entity = lock_combatant(&self.entity);
        if !entity.is_alive() {
            debug!(
                target: "battle::effects",
                entity = %self.entity_id,
                effect = %hot.id,
                "rejected HoT on dead entity"
            );
            return false;
        }

        entity
            .effect_ids_mut()
            .push(EffectKind::HealingOverTime, hot.id.clone());
        trace!(target: "battle::effects", entity = %self.entity_id, effect = %hot.id, "added HoT");
        self.hots.push(hot);
        true
    }

    /// Attaches and immediately applies a stat modifier.
    ///
    /// Stat contributions that cannot be applied are logged and skipped; the
    /// rest of the modifier still lands.
    pub fn add_modifier(&mut self, mut modifier: StatModifier) -> ModifierApplication {
        let application = {
            let mut entity = lock_combatant(&self.entity);
            let application = modifier.apply(&mut *entity, &self.diminishing);
            entity
                .effect_ids_mut()
                .push(EffectKind::StatModifier, modifier.id.clone());
            application
        };

        for err in &application.skipped {
            warn!(
                target: "battle::effects",
                entity = %self.entity_id,
                effect = %modifier.id,
                error = %err,
                "skipped stat contribution"
            );
        }

        let change = modifier_change(&self.entity_id, &modifier);
        self.mods.push(modifier);
        self.bus.publish_sync(Event::ModifierApplied(change));
        application
    }

    /// Removes every DoT instance with `id`. Returns how many were removed.
    pub fn remove_dot(&mut self, id: &str) -> usize {
        let removed = detach(&mut self.dots, id);
        self.forget_ids(EffectKind::DamageOverTime, id, removed);
        removed
    }

    /// Removes every HoT instance with `id`. Returns how many were removed.
    pub fn remove_hot(&mut self, id: &str) -> usize {
        let removed = detach(&mut self.hots, id);
        self.forget_ids(EffectKind::HealingOverTime, id, removed);
        removed
    }

    /// Reverts and removes every modifier with `id`. Returns how many were removed.
    pub fn remove_modifier(&mut self, id: &str) -> usize {
        let (matching, kept): (Vec<_>, Vec<_>) =
            mem::take(&mut self.mods).into_iter().partition(|m| m.id == id);
        self.mods = kept;

        for mut modifier in matching.iter().cloned() {
            let change = modifier_change(&self.entity_id, &modifier);
            let result = modifier.remove(&mut *lock_combatant(&self.entity));
            match result {
                Ok(true) => self.bus.publish_sync(Event::ModifierRemoved(change)),
                Ok(false) => {}
                Err(err) => warn!(
                    target: "battle::effects",
                    entity = %self.entity_id,
                    effect = %modifier.id,
                    error = %err,
                    "failed to fully revert modifier"
                ),
            }
        }

        self.forget_ids(EffectKind::StatModifier, id, matching.len());
        matching.len()
    }

    /// Reverts every modifier and drops all effects (battle end).
    ///
    /// Never-applied modifiers are tolerated. A modifier whose removal fails
    /// or panics is logged and skipped; cleanup always runs to completion.
    /// Returns the number of modifiers that failed to revert.
    pub fn cleanup(&mut self) -> usize {
        let mut failures = 0;
        let mods = mem::take(&mut self.mods);
        for mut modifier in mods {
            let entity = &self.entity;
            let outcome =
                catch_unwind(AssertUnwindSafe(|| modifier.remove(&mut *lock_combatant(entity))));
            let failure = match outcome {
                Ok(Ok(_)) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(reason) = failure {
                failures += 1;
                warn!(
                    target: "battle::effects",
                    entity = %self.entity_id,
                    effect = %modifier.id,
                    reason = %reason,
                    "modifier cleanup failed, continuing"
                );
            }
        }

        self.dots.iter_mut().for_each(|dot| dot.mark_removed());
        self.hots.iter_mut().for_each(|hot| hot.mark_removed());
        self.dots.clear();
        self.hots.clear();
        lock_combatant(&self.entity).effect_ids_mut().clear();

        debug!(target: "battle::effects", entity = %self.entity_id, failures, "effects cleaned up");
        failures
    }

    /// Runs one turn: HoTs, then DoTs, then modifiers, then turn-end passives.
    ///
    /// Turn-start passives are notified before the first phase.
    pub async fn tick(&mut self) -> TickReport {
        self.turn += 1;
        let mut report = TickReport::new(self.turn);
        self.passives.trigger_turn_start(&self.entity, self.turn).await;

        let mut hots = mem::take(&mut self.hots);
        let threshold = self.config.hot_fanout_threshold;
        self.tick_over_time(&mut hots, threshold, &mut report).await;
        self.hots = hots;

        let mut dots = mem::take(&mut self.dots);
        let threshold = self.config.dot_fanout_threshold;
        self.tick_over_time(&mut dots, threshold, &mut report).await;
        self.dots = dots;

        let mut mods = mem::take(&mut self.mods);
        self.tick_modifiers(&mut mods, &mut report).await;
        self.mods = mods;

        self.passives.trigger_turn_end(&self.entity, self.turn).await;
        self.bus
            .publish_async(Event::TurnEnd {
                entity: self.entity_id.clone(),
                turn: self.turn,
            })
            .await;

        trace!(
            target: "battle::effects",
            entity = %self.entity_id,
            turn = self.turn,
            damage = report.damage_dealt,
            healing = report.healing_done,
            expired = report.expired.len(),
            "tick complete"
        );
        report
    }

    async fn tick_over_time<E: OverTime>(
        &self,
        effects: &mut Vec<E>,
        threshold: usize,
        report: &mut TickReport,
    ) {
        if effects.is_empty() {
            return;
        }

        let kind = E::KIND;
        let outcomes = if effects.len() > threshold {
            debug!(
                target: "battle::effects",
                entity = %self.entity_id,
                %kind,
                effects = effects.len(),
                "fanning out effect phase"
            );
            let mut outcomes = Vec::with_capacity(effects.len());
            for (index, batch) in effects.chunks_mut(self.batch_size()).enumerate() {
                if index > 0 {
                    tokio::task::yield_now().await;
                }
                outcomes.extend(join_all(batch.iter_mut().map(|e| self.tick_one(e))).await);
            }
            outcomes
        } else {
            let mut outcomes = Vec::with_capacity(effects.len());
            for effect in effects.iter_mut() {
                outcomes.push(self.tick_one(effect).await);
            }
            outcomes
        };

        let mut expired = Vec::new();
        for (effect, outcome) in effects.iter().zip(&outcomes) {
            match outcome {
                OverTimeOutcome::Skipped => match E::KIND {
                    EffectKind::DamageOverTime => report.skipped_dots += 1,
                    _ => report.skipped_hots += 1,
                },
                OverTimeOutcome::Ticked(tick) => {
                    match E::KIND {
                        EffectKind::DamageOverTime => report.damage_dealt += tick.amount,
                        _ => report.healing_done += tick.amount,
                    }
                    if tick.status.is_expired() {
                        expired.push(effect.effect_id().to_string());
                    }
                }
            }
        }

        let mut outcomes = outcomes.into_iter();
        effects.retain(|_| {
            !matches!(
                outcomes.next(),
                Some(OverTimeOutcome::Ticked(EffectTick {
                    status: TickStatus::Expired,
                    ..
                }))
            )
        });

        self.expire(kind, expired, report).await;
    }

    async fn tick_one<E: OverTime>(&self, effect: &mut E) -> OverTimeOutcome {
        let (tick, event) = {
            let mut entity = lock_combatant(&self.entity);
            if !entity.is_alive() {
                return OverTimeOutcome::Skipped;
            }
            let tick = effect.tick_on(&mut *entity);
            (tick, effect.tick_event(&self.entity_id, tick.amount))
        };
        self.bus.publish_async(event).await;
        if tick.amount > 0 {
            let hook = effect.passive_hook(&self.entity, tick.amount);
            self.passives.trigger(&hook).await;
        }
        OverTimeOutcome::Ticked(tick)
    }

    async fn tick_modifiers(&self, mods: &mut Vec<StatModifier>, report: &mut TickReport) {
        if mods.is_empty() {
            return;
        }

        let expired: Vec<bool> = if mods.len() > self.config.modifier_fanout_threshold {
            debug!(
                target: "battle::effects",
                entity = %self.entity_id,
                modifiers = mods.len(),
                "fanning out modifier phase"
            );
            let mut expired = Vec::with_capacity(mods.len());
            for (index, batch) in mods.chunks_mut(self.batch_size()).enumerate() {
                if index > 0 {
                    tokio::task::yield_now().await;
                }
                expired.extend(join_all(batch.iter_mut().map(|m| self.tick_modifier(m))).await);
            }
            expired
        } else {
            let mut expired = Vec::with_capacity(mods.len());
            for modifier in mods.iter_mut() {
                expired.push(self.tick_modifier(modifier).await);
            }
            expired
        };

        let ids = mods
            .iter()
            .zip(&expired)
            .filter(|(_, expired)| **expired)
            .map(|(m, _)| m.id.clone())
            .collect();

        let mut flags = expired.into_iter();
        mods.retain(|_| !flags.next().unwrap_or(false));

        self.expire(EffectKind::StatModifier, ids, report).await;
    }

    /// Advances one modifier. Returns true when it is finished.
    async fn tick_modifier(&self, modifier: &mut StatModifier) -> bool {
        let change = modifier_change(&self.entity_id, modifier);
        let (status, reverted) = {
            let mut entity = lock_combatant(&self.entity);
            let was_applied = modifier.is_applied();
            let status = modifier.tick(&mut *entity);
            (status, was_applied)
        };

        match status {
            Ok(TickStatus::Active) => false,
            Ok(TickStatus::Expired) => {
                if reverted {
                    self.bus.publish_async(Event::ModifierRemoved(change)).await;
                }
                true
            }
            Err(err) => {
                error!(
                    target: "battle::effects",
                    entity = %self.entity_id,
                    effect = %modifier.id,
                    error = %err,
                    "modifier expired but could not be fully reverted"
                );
                true
            }
        }
    }

    /// Drops expired ids from the entity and announces each expiry.
    async fn expire(&self, kind: EffectKind, ids: Vec<String>, report: &mut TickReport) {
        if ids.is_empty() {
            return;
        }

        {
            let mut entity = lock_combatant(&self.entity);
            let effect_ids = entity.effect_ids_mut();
            for id in &ids {
                effect_ids.remove_one(kind, id);
            }
        }

        for id in ids {
            trace!(
                target: "battle::effects",
                entity = %self.entity_id,
                effect = %id,
                %kind,
                "effect expired"
            );
            self.bus
                .publish_async(Event::EffectExpired {
                    entity: self.entity_id.clone(),
                    effect: id.clone(),
                    kind,
                })
                .await;
            let hook = PassiveHook::EffectExpired(passives::EffectExpired {
                entity: Arc::clone(&self.entity),
                effect: id.clone(),
                kind,
            });
            self.passives.trigger(&hook).await;
            report.expired.push((kind, id));
        }
    }

    fn forget_ids(&self, kind: EffectKind, id: &str, count: usize) {
        if count == 0 {
            return;
        }
        let mut entity = lock_combatant(&self.entity);
        let effect_ids = entity.effect_ids_mut();
        for _ in 0..count {
            effect_ids.remove_one(kind, id);
        }
    }

    fn batch_size(&self) -> usize {
        self.config.fanout_batch_size.max(1)
    }
}

impl std::fmt::Debug for EffectManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectManager")
            .field("entity", &self.entity_id)
            .field("dots", &self.dots.len())
            .field("hots", &self.hots.len())
            .field("mods", &self.mods.len())
            .field("turn", &self.turn)
            .finish()
    }
}

/// Removes every effect with `id`, marking each one removed.
fn detach<E: OverTime>(effects: &mut Vec<E>, id: &str) -> usize {
    let before = effects.len();
    effects.retain_mut(|effect| {
        if effect.effect_id() == id {
            effect.mark_removed();
            false
        } else {
            true
        }
    });
    before - effects.len()
}

fn modifier_change(entity: &str, modifier: &StatModifier) -> ModifierChange {
    let deltas: Vec<(Stat, f64)> = modifier
        .applied_deltas()
        .map(|applied| applied.iter().map(|(stat, delta)| (*stat, *delta)).collect())
        .unwrap_or_default();
    ModifierChange {
        entity: entity.to_string(),
        effect: modifier.id.clone(),
        deltas,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use battle_core::{EffectError, EffectIds, Fighter, HealOptions, get_current_stat_value};

    use super::*;
    use crate::combatant::share;
    use crate::events::{Handler, names};

    fn manager(entity: SharedCombatant) -> EffectManager {
        EffectManager::new(
            entity,
            EventBus::new(),
            Arc::new(PassiveRegistry::empty()),
            Arc::new(DiminishingReturns::standard()),
            EffectConfig::default(),
        )
    }

    fn hp(entity: &SharedCombatant) -> i64 {
        lock_combatant(entity).hp()
    }

    fn ids(entity: &SharedCombatant) -> EffectIds {
        lock_combatant(entity).effect_ids().clone()
    }

    #[tokio::test]
    async fn dot_ticks_until_expiry() {
        let slime = share(Fighter::new("slime", 1000));
        let mut effects = manager(Arc::clone(&slime));
        assert!(effects.add_dot(DamageOverTime::new("Bleed", "bleed", 50, 3), None));

        effects.tick().await;
        assert_eq!(hp(&slime), 950);
        effects.tick().await;
        assert_eq!(hp(&slime), 900);
        let report = effects.tick().await;
        assert_eq!(hp(&slime), 850);
        assert_eq!(report.expired, vec![(EffectKind::DamageOverTime, "bleed".to_string())]);
        assert!(effects.dots().is_empty());
        assert!(ids(&slime).dots.is_empty());
    }

    #[tokio::test]
    async fn hots_run_before_dots() {
        let hero = share(Fighter::new("hero", 100).with_hp(10));
        let mut effects = manager(Arc::clone(&hero));
        effects.add_dot(DamageOverTime::new("Poison", "poison", 15, 2), None);
        effects.add_hot(HealingOverTime::new("Regen", "regen", 10, 2));

        let report = effects.tick().await;
        assert_eq!(report.healing_done, 10);
        assert_eq!(report.damage_dealt, 15);
        assert_eq!(hp(&hero), 5);
    }

    #[tokio::test]
    async fn remaining_dots_are_skipped_after_death() {
        let hero = share(Fighter::new("hero", 30));
        let mut effects = manager(Arc::clone(&hero));
        effects.add_dot(DamageOverTime::new("Burn", "burn", 40, 3), None);
        effects.add_dot(DamageOverTime::new("Poison", "poison", 10, 3), None);

        let report = effects.tick().await;
        assert_eq!(hp(&hero), 0);
        assert_eq!(report.skipped_dots, 1);
        assert_eq!(effects.dots()[1].turns.as_turns(), 3);
    }

    #[tokio::test]
    async fn dead_entities_reject_new_over_time_effects() {
        let ghost = share(Fighter::new("ghost", 10).with_hp(0));
        let mut effects = manager(Arc::clone(&ghost));
        assert!(!effects.add_dot(DamageOverTime::new("Burn", "burn", 5, 2), None));
        assert!(!effects.add_hot(HealingOverTime::new("Regen", "regen", 5, 2)));
        assert!(ids(&ghost).is_empty());
    }

    #[test]
    fn stack_cap_rejects_without_refresh() {
        let slime = share(Fighter::new("slime", 100));
        let mut effects = manager(Arc::clone(&slime));
        assert!(effects.add_dot(DamageOverTime::new("Bleed", "bleed", 5, 3), Some(2)));
        assert!(effects.add_dot(DamageOverTime::new("Bleed", "bleed", 5, 9), Some(2)));
        assert!(!effects.add_dot(DamageOverTime::new("Bleed", "bleed", 5, 9), Some(2)));

        assert_eq!(effects.dots().len(), 2);
        assert_eq!(effects.dots()[0].turns.as_turns(), 3);
        assert_eq!(ids(&slime).dots, vec!["bleed", "bleed"]);
    }

    #[tokio::test]
    async fn bypassed_modifier_reverts_on_expiry() {
        let knight = share(Fighter::new("knight", 500).with_stat(Stat::Atk, 100.0));
        let mut effects = manager(Arc::clone(&knight));
        effects.add_modifier(
            StatModifier::new("War Cry", "war_cry", 2)
                .with_delta(Stat::Atk, 50.0)
                .bypass_diminishing(),
        );
        assert_eq!(get_current_stat_value(&*lock_combatant(&knight), Stat::Atk), 150.0);

        effects.tick().await;
        assert_eq!(get_current_stat_value(&*lock_combatant(&knight), Stat::Atk), 150.0);
        let report = effects.tick().await;
        assert_eq!(get_current_stat_value(&*lock_combatant(&knight), Stat::Atk), 100.0);
        assert_eq!(
            report.expired_ids(EffectKind::StatModifier).collect::<Vec<_>>(),
            vec!["war_cry"]
        );
        assert!(ids(&knight).mods.is_empty());
    }

    #[tokio::test]
    async fn permanent_effects_stay_until_removed() {
        let hero = share(Fighter::new("hero", 100).with_stat(Stat::Defense, 50.0));
        let mut effects = manager(Arc::clone(&hero));
        effects.add_hot(HealingOverTime::new("Blessing", "blessing", 1, -1));
        effects.add_modifier(
            StatModifier::new("Relic", "relic", -1)
                .with_delta(Stat::Defense, 10.0)
                .bypass_diminishing(),
        );

        for _ in 0..5 {
            effects.tick().await;
        }
        assert_eq!(effects.hots().len(), 1);
        assert_eq!(effects.modifiers().len(), 1);

        assert_eq!(effects.remove_modifier("relic"), 1);
        assert_eq!(effects.remove_hot("blessing"), 1);
        assert_eq!(get_current_stat_value(&*lock_combatant(&hero), Stat::Defense), 50.0);
        assert!(ids(&hero).is_empty());
    }

    #[tokio::test]
    async fn fan_out_processes_every_effect() {
        let titan = share(Fighter::new("titan", 100_000));
        let mut effects = manager(Arc::clone(&titan));
        for i in 0..45 {
            effects.add_dot(DamageOverTime::new("Bleed", format!("bleed_{i}"), 10, 1), None);
        }

        let report = effects.tick().await;
        assert_eq!(report.damage_dealt, 450);
        assert_eq!(report.expired.len(), 45);
        assert_eq!(hp(&titan), 100_000 - 450);
        assert!(ids(&titan).dots.is_empty());
    }

    #[tokio::test]
    async fn tick_publishes_effect_events() {
        let slime = share(Fighter::new("slime", 100));
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let _guards: Vec<_> = [names::DOT_TICK, names::EFFECT_EXPIRED, names::TURN_END]
            .into_iter()
            .map(|name| {
                let record = Arc::clone(&record);
                bus.subscribe_scoped(
                    name,
                    Handler::sync("record", move |event| {
                        record.lock().unwrap().push(event.name().to_string());
                        Ok(())
                    }),
                )
            })
            .collect();

        let mut effects = EffectManager::new(
            Arc::clone(&slime),
            bus,
            Arc::new(PassiveRegistry::empty()),
            Arc::new(DiminishingReturns::standard()),
            EffectConfig::default(),
        );
        effects.add_dot(DamageOverTime::new("Burn", "burn", 5, 1), None);
        effects.tick().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![names::DOT_TICK, names::EFFECT_EXPIRED, names::TURN_END]
        );
    }

    /// Combatant whose stat adjustments panic once armed.
    struct Brittle {
        inner: Fighter,
        armed: bool,
    }

    impl Combatant for Brittle {
        fn id(&self) -> &str {
            self.inner.id()
        }
        fn hp(&self) -> i64 {
            self.inner.hp()
        }
        fn max_hp(&self) -> i64 {
            self.inner.max_hp()
        }
        fn base_stat(&self, stat: Stat) -> Option<f64> {
            self.inner.base_stat(stat)
        }
        fn current_stat(&self, stat: Stat) -> Option<f64> {
            self.inner.current_stat(stat)
        }
        fn adjust_stat(&mut self, stat: Stat, delta: f64) -> Result<(), EffectError> {
            if self.armed && stat == Stat::Atk {
                panic!("stat table corrupted");
            }
            self.inner.adjust_stat(stat, delta)
        }
        fn apply_damage(&mut self, amount: i64, source: Option<&str>) -> i64 {
            self.inner.apply_damage(amount, source)
        }
        fn apply_healing(
            &mut self,
            amount: i64,
            source: Option<&str>,
            options: HealOptions,
        ) -> i64 {
            self.inner.apply_healing(amount, source, options)
        }
        fn effect_ids(&self) -> &EffectIds {
            self.inner.effect_ids()
        }
        fn effect_ids_mut(&mut self) -> &mut EffectIds {
            self.inner.effect_ids_mut()
        }
    }

    #[test]
    fn cleanup_survives_failing_modifiers() {
        let brittle = Arc::new(Mutex::new(Brittle {
            inner: Fighter::new("golem", 100)
                .with_stat(Stat::Atk, 10.0)
                .with_stat(Stat::Defense, 10.0),
            armed: false,
        }));
        let entity: SharedCombatant = brittle.clone();
        let mut effects = manager(entity);
        effects.add_modifier(
            StatModifier::new("Rage", "rage", 3)
                .with_delta(Stat::Atk, 5.0)
                .bypass_diminishing(),
        );
        effects.add_modifier(
            StatModifier::new("Stone", "stone", 3)
                .with_delta(Stat::Defense, 5.0)
                .bypass_diminishing(),
        );
        effects.add_hot(HealingOverTime::new("Regen", "regen", 1, 3));
        brittle.lock().unwrap().armed = true;

        assert_eq!(effects.cleanup(), 1);
        assert!(effects.is_empty());

        let golem = brittle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(golem.effect_ids().is_empty());
        assert_eq!(golem.current_stat(Stat::Defense), Some(10.0));
    }
}
