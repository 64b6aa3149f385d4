//! Per-entity effect bookkeeping and turn ticking.
//!
//! Each entity in battle has exactly one [`EffectManager`]. It owns the live
//! effect objects, keeps the entity's [`EffectIds`](battle_core::EffectIds)
//! in lockstep with them, and runs the per-turn tick:
//!
//! ```text
//! HoT phase -> DoT phase -> StatModifier phase -> Passive phase
//! ```
//!
//! Large collections are processed concurrently in fixed-size batches with a
//! cooperative yield between batches; small ones run sequentially in list
//! order.

mod manager;
mod report;

pub use manager::EffectManager;
pub use report::TickReport;
