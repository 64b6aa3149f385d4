//! Registry that fans hooks out to passive plugins.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error};

use super::{HookKind, Passive, PassiveHook, TurnContext};
use crate::combatant::SharedCombatant;
use crate::config::EffectConfig;

/// Holds every registered passive and delivers hooks to them.
///
/// Triggering is total: a failing passive is logged and the remaining
/// passives still run.
pub struct PassiveRegistry {
    passives: Vec<Arc<dyn Passive>>,
    fanout_threshold: usize,
    fanout_batch: usize,
}

impl PassiveRegistry {
    /// Creates a registry; passives are sorted by priority (lower values first).
    pub fn new(mut passives: Vec<Arc<dyn Passive>>, config: &EffectConfig) -> Self {
        passives.sort_by_key(|p| p.priority());
        Self {
            passives,
            fanout_threshold: config.passive_fanout_threshold,
            fanout_batch: config.fanout_batch_size.max(1),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), &EffectConfig::default())
    }

    pub fn register(&mut self, passive: Arc<dyn Passive>) {
        self.passives.push(passive);
        self.passives.sort_by_key(|p| p.priority());
    }

    pub fn len(&self) -> usize {
        self.passives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passives.is_empty()
    }

    /// Passives subscribed to `kind`, in priority order.
    pub fn handling(&self, kind: HookKind) -> Vec<Arc<dyn Passive>> {
        self.passives
            .iter()
            .filter(|p| p.hooks().contains(&kind))
            .cloned()
            .collect()
    }

    /// Returns an iterator over passive ids and priorities (for debugging).
    pub fn passives(&self) -> impl Iterator<Item = (&str, i32)> + '_ {
        self.passives.iter().map(|p| (p.id(), p.priority()))
    }

    /// Delivers `hook` to every passive that handles its kind.
    pub async fn trigger(&self, hook: &PassiveHook) {
        let eligible = self.handling(hook.kind());
        if eligible.is_empty() {
            return;
        }

        if eligible.len() > self.fanout_threshold {
            debug!(
                target: "battle::passives",
                hook = %hook.kind(),
                passives = eligible.len(),
                "fanning out passive hook"
            );
            for (index, batch) in eligible.chunks(self.fanout_batch).enumerate() {
                if index > 0 {
                    tokio::task::yield_now().await;
                }
                join_all(batch.iter().map(|passive| run(passive.as_ref(), hook))).await;
            }
        } else {
            for passive in &eligible {
                run(passive.as_ref(), hook).await;
            }
        }
    }

    /// Turn-start notification for one entity.
    pub async fn trigger_turn_start(&self, entity: &SharedCombatant, turn: u64) {
        let hook = PassiveHook::TurnStart(TurnContext {
            entity: Arc::clone(entity),
            turn,
        });
        self.trigger(&hook).await;
    }

    /// Turn-end notification for one entity.
    pub async fn trigger_turn_end(&self, entity: &SharedCombatant, turn: u64) {
        let hook = PassiveHook::TurnEnd(TurnContext {
            entity: Arc::clone(entity),
            turn,
        });
        self.trigger(&hook).await;
    }
}

impl Default for PassiveRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

async fn run(passive: &dyn Passive, hook: &PassiveHook) {
    if let Err(err) = passive.on_hook(hook).await {
        error!(
            target: "battle::passives",
            passive = passive.id(),
            hook = %hook.kind(),
            error = %err,
            "Passive hook failed, continuing"
        );
    }
}
