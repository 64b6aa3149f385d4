//! Battle-level wiring.
//!
//! A [`Battle`] owns what every entity's effect manager shares: the event
//! bus, the passive registry, the diminishing-returns table and the runtime
//! configuration. Entities join through [`Battle::enroll`].

use std::sync::Arc;

use battle_core::{DiminishingCurve, DiminishingReturns, Stat};
use tracing::debug;

use crate::combatant::SharedCombatant;
use crate::config::RuntimeConfig;
use crate::effects::EffectManager;
use crate::error::{Result, RuntimeError};
use crate::events::EventBus;
use crate::passives::{Passive, PassiveRegistry};

/// Shared battle context.
///
/// Cloning is cheap: clones share the bus, passives and table.
#[derive(Clone)]
pub struct Battle {
    config: RuntimeConfig,
    bus: EventBus,
    passives: Arc<PassiveRegistry>,
    diminishing: Arc<DiminishingReturns>,
}

impl Battle {
    /// Create a new battle builder
    pub fn builder() -> BattleBuilder {
        BattleBuilder::new()
    }

    /// Creates the effect manager for an entity entering battle.
    ///
    /// Each entity must be enrolled exactly once.
    pub fn enroll(&self, entity: SharedCombatant) -> EffectManager {
        let manager = EffectManager::new(
            entity,
            self.bus.clone(),
            Arc::clone(&self.passives),
            Arc::clone(&self.diminishing),
            self.config.effects.clone(),
        );
        debug!(target: "battle::effects", entity = manager.entity_id(), "entity enrolled");
        manager
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn passives(&self) -> &PassiveRegistry {
        &self.passives
    }

    pub fn diminishing(&self) -> &DiminishingReturns {
        &self.diminishing
    }

    /// Drains pending batched events (battle end).
    pub async fn finish(&self) {
        self.bus.flush_batches().await;
    }
}

impl std::fmt::Debug for Battle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Battle")
            .field("bus", &self.bus)
            .field("passives", &self.passives.len())
            .finish()
    }
}

/// Builder for [`Battle`].
pub struct BattleBuilder {
    config: RuntimeConfig,
    bus: Option<EventBus>,
    passives: Vec<Arc<dyn Passive>>,
    curves: Option<Vec<(Stat, DiminishingCurve)>>,
}

impl BattleBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            bus: None,
            passives: Vec::new(),
            curves: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an existing bus instead of creating one from the bus config.
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn passive(mut self, passive: impl Passive + 'static) -> Self {
        self.passives.push(Arc::new(passive));
        self
    }

    pub fn passives(mut self, passives: impl IntoIterator<Item = Arc<dyn Passive>>) -> Self {
        self.passives.extend(passives);
        self
    }

    /// Replace the standard diminishing-returns table.
    ///
    /// Entries are validated in [`build`](Self::build).
    pub fn diminishing_returns(mut self, curves: Vec<(Stat, DiminishingCurve)>) -> Self {
        self.curves = Some(curves);
        self
    }

    /// Build the battle context.
    pub fn build(self) -> Result<Battle> {
        if self.config.effects.fanout_batch_size == 0 {
            return Err(RuntimeError::InvalidConfig(
                "fanout batch size must be positive".to_string(),
            ));
        }
        if self.config.bus.batch_chunk_size == 0 {
            return Err(RuntimeError::InvalidConfig(
                "batch chunk size must be positive".to_string(),
            ));
        }

        let diminishing = match self.curves {
            Some(curves) => DiminishingReturns::new(curves)?,
            None => DiminishingReturns::standard(),
        };
        let bus = self
            .bus
            .unwrap_or_else(|| EventBus::with_config(self.config.bus.clone()));
        let passives = PassiveRegistry::new(self.passives, &self.config.effects);

        Ok(Battle {
            config: self.config,
            bus,
            passives: Arc::new(passives),
            diminishing: Arc::new(diminishing),
        })
    }
}

#[cfg(test)]
mod tests {
    use battle_core::{ConfigError, Fighter};

    use super::*;
    use crate::combatant::share;

    #[test]
    fn builds_with_standard_table() {
        let battle = Battle::builder().build().unwrap();
        assert!(battle.diminishing().is_configured(Stat::Atk));
        assert!(battle.passives().is_empty());

        let manager = battle.enroll(share(Fighter::new("hero", 10)));
        assert_eq!(manager.entity_id(), "hero");
    }

    #[test]
    fn rejects_invalid_curves() {
        let err = Battle::builder()
            .diminishing_returns(vec![(
                Stat::Atk,
                DiminishingCurve {
                    threshold: 0.0,
                    scaling_factor: 2.0,
                    base_offset: 0.0,
                },
            )])
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::DiminishingReturns(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn rejects_zero_batch_sizes() {
        let mut config = RuntimeConfig::default();
        config.effects.fanout_batch_size = 0;
        let err = Battle::builder().config(config).build().unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfig(_)));
    }
}
