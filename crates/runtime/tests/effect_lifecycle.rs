use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use battle_core::{
    Combatant, DamageOverTime, EffectKind, Fighter, HealOptions, HealingOverTime, Stat,
    StatModifier, get_current_stat_value,
};
use battle_runtime::{
    Battle, Event, Handler, HookKind, Passive, PassiveError, PassiveHook, SharedCombatant,
    lock_combatant, names, share,
};

fn stat(entity: &SharedCombatant, stat: Stat) -> f64 {
    get_current_stat_value(&*lock_combatant(entity), stat)
}

fn hp(entity: &SharedCombatant) -> i64 {
    lock_combatant(entity).hp()
}

/// Scenario: max_hp 1000, DoT {damage: 50, turns: 3}.
#[tokio::test]
async fn damage_over_time_scenario() {
    let battle = Battle::builder().build().unwrap();
    let remaining = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&remaining);
    let _guard = battle.bus().subscribe_scoped(
        names::DOT_TICK,
        Handler::sync("remaining", move |event| {
            if let Event::DamageOverTimeTick(tick) = event {
                record.lock().unwrap().push(tick.remaining);
            }
            Ok(())
        }),
    );

    let entity = share(Fighter::new("E", 1000));
    let mut effects = battle.enroll(Arc::clone(&entity));
    assert!(effects.add_dot(DamageOverTime::new("Bleed", "bleed", 50, 3), None));

    effects.tick().await;
    assert_eq!(hp(&entity), 950);
    assert_eq!(effects.dots().len(), 1);

    effects.tick().await;
    assert_eq!(hp(&entity), 900);
    assert_eq!(effects.dots().len(), 1);

    let report = effects.tick().await;
    assert_eq!(hp(&entity), 850);
    assert!(effects.dots().is_empty());
    assert!(lock_combatant(&entity).effect_ids().dots.is_empty());
    assert_eq!(report.expired_ids(EffectKind::DamageOverTime).collect::<Vec<_>>(), vec!["bleed"]);
    assert_eq!(*remaining.lock().unwrap(), vec![2, 1, 0]);
}

/// Scenario: bypassed {atk: +50} for 2 turns on base atk 100.
#[tokio::test]
async fn bypassed_modifier_scenario() {
    let battle = Battle::builder().build().unwrap();
    let entity = share(Fighter::new("E", 1000).with_stat(Stat::Atk, 100.0));
    let mut effects = battle.enroll(Arc::clone(&entity));

    effects.add_modifier(
        StatModifier::new("Battle Hymn", "hymn", 2)
            .with_delta(Stat::Atk, 50.0)
            .bypass_diminishing(),
    );
    assert_eq!(stat(&entity, Stat::Atk), 150.0);

    effects.tick().await;
    assert_eq!(stat(&entity, Stat::Atk), 150.0);
    effects.tick().await;
    assert_eq!(stat(&entity, Stat::Atk), 100.0);
    assert!(effects.modifiers().is_empty());
}

#[tokio::test]
async fn effects_expire_after_exactly_their_duration() {
    let battle = Battle::builder().build().unwrap();

    for turns in 1..=6 {
        let entity = share(Fighter::new("E", 10_000).with_stat(Stat::Defense, 100.0));
        let mut effects = battle.enroll(Arc::clone(&entity));
        effects.add_dot(DamageOverTime::new("Bleed", "bleed", 1, turns), None);
        effects.add_hot(HealingOverTime::new("Regen", "regen", 1, turns));
        effects.add_modifier(
            StatModifier::new("Guard", "guard", turns).with_delta(Stat::Defense, 10.0),
        );

        for _ in 1..turns {
            effects.tick().await;
        }
        assert_eq!(effects.effect_count(), 3, "expired early with turns = {turns}");

        effects.tick().await;
        assert!(effects.is_empty(), "still live after {turns} ticks");
        assert!(lock_combatant(&entity).effect_ids().is_empty());
        assert_eq!(stat(&entity, Stat::Defense), 100.0);
    }
}

#[tokio::test]
async fn stacking_is_capped() {
    let battle = Battle::builder().build().unwrap();
    let entity = share(Fighter::new("E", 1000));
    let mut effects = battle.enroll(Arc::clone(&entity));

    let cap = 3;
    let accepted: Vec<bool> = (0..=cap)
        .map(|_| effects.add_dot(DamageOverTime::new("Poison", "poison", 5, 4), Some(cap)))
        .collect();

    assert_eq!(accepted, vec![true, true, true, false]);
    assert_eq!(effects.dots().len(), cap);
    assert_eq!(lock_combatant(&entity).effect_ids().dots.len(), cap);
}

#[tokio::test]
async fn applying_twice_changes_stats_once() {
    let battle = Battle::builder().build().unwrap();
    let mut fighter = Fighter::new("E", 1000).with_stat(Stat::CritRate, 0.2);
    let mut modifier = StatModifier::new("Focus", "focus", 3).with_delta(Stat::CritRate, 0.1);

    modifier.apply(&mut fighter, battle.diminishing());
    let once = fighter.current_stat(Stat::CritRate);
    let again = modifier.apply(&mut fighter, battle.diminishing());

    assert!(!again.changed);
    assert_eq!(fighter.current_stat(Stat::CritRate), once);
}

#[tokio::test]
async fn cleanup_empties_everything() {
    let battle = Battle::builder().build().unwrap();
    let entity = share(Fighter::new("E", 1000).with_stat(Stat::Atk, 100.0));
    let mut effects = battle.enroll(Arc::clone(&entity));

    effects.add_dot(DamageOverTime::new("Bleed", "bleed", 5, -1), None);
    effects.add_hot(HealingOverTime::new("Regen", "regen", 5, 2));
    effects.add_modifier(
        StatModifier::new("Bad", "bad", 2)
            .with_named_delta("luck", 5.0)
            .with_delta(Stat::Atk, 20.0)
            .bypass_diminishing(),
    );
    assert_eq!(stat(&entity, Stat::Atk), 120.0);

    assert_eq!(effects.cleanup(), 0);
    assert!(effects.is_empty());
    assert!(lock_combatant(&entity).effect_ids().is_empty());
    assert_eq!(stat(&entity, Stat::Atk), 100.0);
}

struct TurnCounter {
    seen: Arc<AtomicU64>,
}

#[async_trait]
impl Passive for TurnCounter {
    fn id(&self) -> &str {
        "turn_counter"
    }

    fn hooks(&self) -> &[HookKind] {
        &[HookKind::TurnEnd]
    }

    async fn on_hook(&self, hook: &PassiveHook) -> Result<(), PassiveError> {
        if let PassiveHook::TurnEnd(ctx) = hook {
            self.seen.store(ctx.turn, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct Grudge;

#[async_trait]
impl Passive for Grudge {
    fn id(&self) -> &str {
        "grudge"
    }

    fn hooks(&self) -> &[HookKind] {
        &[HookKind::TurnEnd]
    }

    fn priority(&self) -> i32 {
        -1
    }

    async fn on_hook(&self, _hook: &PassiveHook) -> Result<(), PassiveError> {
        Err(PassiveError::new("grudge", "always angry"))
    }
}

#[tokio::test]
async fn turn_end_passives_run_after_effects() {
    let seen = Arc::new(AtomicU64::new(0));
    let battle = Battle::builder()
        .passive(Grudge)
        .passive(TurnCounter {
            seen: Arc::clone(&seen),
        })
        .build()
        .unwrap();

    let entity = share(Fighter::new("E", 100));
    let mut effects = battle.enroll(entity);
    effects.tick().await;
    effects.tick().await;

    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn remaining_hots_are_skipped_once_the_entity_falls() {
    let battle = Battle::builder().build().unwrap();
    let entity = share(Fighter::new("E", 100).with_hp(50));
    let victim = Arc::clone(&entity);
    let _guard = battle.bus().subscribe_scoped(
        names::HOT_TICK,
        Handler::sync("ambush", move |_| {
            lock_combatant(&victim).apply_damage(1_000, Some("ambush"));
            Ok(())
        }),
    );

    let mut effects = battle.enroll(Arc::clone(&entity));
    effects.add_hot(HealingOverTime::new("Regen", "regen", 5, 3));
    effects.add_hot(HealingOverTime::new("Salve", "salve", 5, 3));

    let report = effects.tick().await;
    assert_eq!(report.healing_done, 5);
    assert_eq!(report.skipped_hots, 1);
    assert_eq!(hp(&entity), 0);
    assert_eq!(effects.hots()[1].turns.as_turns(), 3);
}

#[tokio::test]
async fn fanned_out_dots_stop_at_death() {
    let battle = Battle::builder().build().unwrap();
    let _guard = battle.bus().subscribe_scoped(
        names::DOT_TICK,
        Handler::future("slow_log", |_| async {
            tokio::task::yield_now().await;
            Ok(())
        }),
    );

    let entity = share(Fighter::new("E", 100));
    let mut effects = battle.enroll(Arc::clone(&entity));
    for i in 0..30 {
        effects.add_dot(DamageOverTime::new("Bleed", format!("bleed_{i}"), 10, 3), None);
    }

    let report = effects.tick().await;
    assert_eq!(report.damage_dealt, 100);
    assert_eq!(report.skipped_dots, 20);
    assert_eq!(hp(&entity), 0);
    assert_eq!(effects.dots().len(), 30);
}

/// Writes every hook it sees as a short line.
struct Chronicle {
    lines: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Passive for Chronicle {
    fn id(&self) -> &str {
        "chronicle"
    }

    fn hooks(&self) -> &[HookKind] {
        &[
            HookKind::TurnStart,
            HookKind::TurnEnd,
            HookKind::DamageTaken,
            HookKind::HealReceived,
            HookKind::EffectExpired,
        ]
    }

    async fn on_hook(&self, hook: &PassiveHook) -> Result<(), PassiveError> {
        let line = match hook {
            PassiveHook::TurnStart(ctx) => format!("turn_start {}", ctx.turn),
            PassiveHook::TurnEnd(ctx) => format!("turn_end {}", ctx.turn),
            PassiveHook::DamageTaken(hit) => {
                format!("damage {} from {:?}", hit.amount, hit.source)
            }
            PassiveHook::HealReceived(heal) => {
                format!("heal {} from {:?}", heal.amount, heal.source)
            }
            PassiveHook::EffectExpired(gone) => format!("expired {} {}", gone.kind, gone.effect),
        };
        self.lines.lock().unwrap().push(line);
        Ok(())
    }
}

#[tokio::test]
async fn passives_hear_every_hook_kind_in_phase_order() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let battle = Battle::builder()
        .passive(Chronicle {
            lines: Arc::clone(&lines),
        })
        .build()
        .unwrap();

    let entity = share(Fighter::new("E", 100).with_hp(50));
    let mut effects = battle.enroll(Arc::clone(&entity));
    effects.add_hot(HealingOverTime::new("Prayer", "prayer", 10, 1).with_source("cleric"));
    effects.add_dot(DamageOverTime::new("Poison", "poison", 5, 1).with_source("goblin"), None);
    effects.tick().await;

    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "turn_start 1".to_string(),
            "heal 10 from Some(\"cleric\")".to_string(),
            format!("expired {} prayer", EffectKind::HealingOverTime),
            "damage 5 from Some(\"goblin\")".to_string(),
            format!("expired {} poison", EffectKind::DamageOverTime),
            "turn_end 1".to_string(),
        ]
    );
    assert_eq!(hp(&entity), 55);
}

#[tokio::test]
async fn fully_absorbed_ticks_raise_no_damage_hook() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let battle = Battle::builder()
        .passive(Chronicle {
            lines: Arc::clone(&lines),
        })
        .build()
        .unwrap();

    let mut fighter = Fighter::new("E", 100);
    fighter.apply_healing(50, None, HealOptions::overheal());
    let entity = share(fighter);
    let mut effects = battle.enroll(Arc::clone(&entity));
    effects.add_dot(DamageOverTime::new("Poison", "poison", 5, 2), None);
    effects.tick().await;

    assert!(!lines.lock().unwrap().iter().any(|line| line.starts_with("damage")));
    assert_eq!(hp(&entity), 100);
}
