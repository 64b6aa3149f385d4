//! Shared handles to battle entities.
//!
//! Entities are owned by the battle layer and shared with effect managers,
//! passives and event handlers. Locks are only ever held inside synchronous
//! sections, never across an `.await`.
use std::sync::{Arc, Mutex, MutexGuard};

use battle_core::Combatant;

use crate::sync::lock;

pub type SharedCombatant = Arc<Mutex<dyn Combatant>>;

/// Wraps a combatant for sharing across the runtime.
pub fn share<C: Combatant + 'static>(combatant: C) -> SharedCombatant {
    Arc::new(Mutex::new(combatant))
}

/// Locks a shared combatant, riding through poisoning.
pub fn lock_combatant(entity: &SharedCombatant) -> MutexGuard<'_, dyn Combatant + 'static> {
    lock(entity)
}
