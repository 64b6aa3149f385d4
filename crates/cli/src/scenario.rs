//! A small two-combatant battle that exercises every effect kind.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use battle_core::{
    Combatant, DamageOverTime, Fighter, HealingOverTime, Stat, StatModifier,
    get_current_stat_value,
};
use battle_runtime::{
    Battle, Event, EventStats, Handler, HookKind, Passive, PassiveError, PassiveHook,
    RuntimeConfig, SharedCombatant, TickReport, lock_combatant, names, share,
};
use tracing::{info, warn};

/// Restores a little hp to whoever ends a turn below half health.
struct SecondWind {
    restored: Arc<AtomicI64>,
}

#[async_trait]
impl Passive for SecondWind {
    fn id(&self) -> &str {
        "second_wind"
    }

    fn hooks(&self) -> &[HookKind] {
        &[HookKind::TurnEnd]
    }

    async fn on_hook(&self, hook: &PassiveHook) -> Result<(), PassiveError> {
        let PassiveHook::TurnEnd(ctx) = hook else {
            return Ok(());
        };
        let mut entity = lock_combatant(&ctx.entity);
        if entity.is_alive() && entity.hp() * 2 < entity.max_hp() {
            let healed = entity.apply_healing(10, Some("second_wind"), Default::default());
            self.restored.fetch_add(healed, Ordering::Relaxed);
        }
        Ok(())
    }
}

pub struct Summary {
    turns: u64,
    combatants: Vec<(String, i64, i64, f64)>,
    damage: i64,
    healing: i64,
    restored: i64,
    events: Vec<(String, EventStats)>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Battle finished after {} turns", self.turns)?;
        for (id, hp, max_hp, atk) in &self.combatants {
            writeln!(f, "  {id:<8} hp {hp:>5}/{max_hp:<5} atk {atk:.1}")?;
        }
        writeln!(
            f,
            "  damage over time {}, healing over time {}, second wind {}",
            self.damage, self.healing, self.restored
        )?;
        for (event, stats) in &self.events {
            writeln!(
                f,
                "  {event:<18} {:>4} calls, {:.0}% errors, avg {:?}",
                stats.count,
                stats.error_rate() * 100.0,
                stats.avg_duration
            )?;
        }
        Ok(())
    }
}

pub async fn run(config: RuntimeConfig, turns: u64) -> Result<Summary> {
    let restored = Arc::new(AtomicI64::new(0));
    let battle = Battle::builder()
        .config(config)
        .passive(SecondWind {
            restored: Arc::clone(&restored),
        })
        .build()?;

    let _ticks = battle.bus().subscribe_scoped(
        names::DOT_TICK,
        Handler::sync("log_dot", |event| {
            if let Event::DamageOverTimeTick(tick) = event {
                info!(entity = %tick.entity, effect = %tick.name, amount = tick.amount, "dot tick");
            }
            Ok(())
        }),
    );
    let _expired = battle.bus().subscribe_scoped(
        names::EFFECT_EXPIRED,
        Handler::future("log_expiry", |event| async move {
            if let Event::EffectExpired { entity, effect, kind } = event {
                info!(%entity, %effect, %kind, "effect expired");
            }
            Ok(())
        }),
    );

    let hero = share(
        Fighter::new("hero", 1200)
            .with_stat(Stat::Atk, 180.0)
            .with_stat(Stat::Defense, 90.0)
            .with_stat(Stat::CritRate, 0.15),
    );
    let slime = share(
        Fighter::new("slime", 900)
            .with_stat(Stat::Atk, 60.0)
            .with_stat(Stat::Defense, 40.0),
    );

    let mut hero_effects = battle.enroll(Arc::clone(&hero));
    let mut slime_effects = battle.enroll(Arc::clone(&slime));

    hero_effects.add_modifier(
        StatModifier::new("Sharpened Blade", "sharpened_blade", 3)
            .with_delta(Stat::Atk, 40.0)
            .with_multiplier(Stat::CritRate, 1.5),
    );
    hero_effects.add_modifier(
        StatModifier::new("Guild Crest", "guild_crest", -1)
            .with_delta(Stat::Defense, 15.0)
            .bypass_diminishing(),
    );
    hero_effects
        .add_hot(HealingOverTime::new("Field Ration", "field_ration", 25, 4).with_overheal());
    hero_effects.add_dot(DamageOverTime::new("Acid", "acid", 35, 2).with_source("slime"), Some(1));

    for _ in 0..3 {
        if !slime_effects.add_dot(
            DamageOverTime::new("Bleed", "bleed", 60, 3).with_source("hero"),
            Some(2),
        ) {
            warn!(entity = "slime", "bleed stack cap reached");
        }
    }
    slime_effects.add_hot(HealingOverTime::new("Ooze", "ooze", 15, -1));

    let mut damage = 0;
    let mut healing = 0;
    for turn in 1..=turns {
        let reports: [TickReport; 2] = [hero_effects.tick().await, slime_effects.tick().await];
        for report in &reports {
            damage += report.damage_dealt;
            healing += report.healing_done;
        }
        info!(turn, hero = hp(&hero), slime = hp(&slime), "turn complete");
    }

    let failures = hero_effects.cleanup() + slime_effects.cleanup();
    if failures > 0 {
        warn!(failures, "some modifiers could not be reverted");
    }
    battle.finish().await;

    let combatants = [&hero, &slime]
        .into_iter()
        .map(|entity| {
            let entity = lock_combatant(entity);
            (
                entity.id().to_string(),
                entity.hp(),
                entity.max_hp(),
                get_current_stat_value(&*entity, Stat::Atk),
            )
        })
        .collect();

    Ok(Summary {
        turns,
        combatants,
        damage,
        healing,
        restored: restored.load(Ordering::Relaxed),
        events: battle.bus().metrics().snapshot().events.into_iter().collect(),
    })
}

fn hp(entity: &SharedCombatant) -> i64 {
    lock_combatant(entity).hp()
}
