//! Derived combat stats targeted by modifiers and diminishing returns.
//!
//! Stats are a closed set so plugins cannot target a stat that no combatant
//! could ever carry. Names round-trip through their snake_case form, which is
//! how content files and plugins refer to them.

use crate::error::EffectError;

/// Derived stats a [`StatModifier`](crate::effects::StatModifier) can adjust.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Stat {
    MaxHp,
    Atk,
    Defense,
    CritRate,
    CritDamage,
    EffectHitRate,
    EffectResistance,
    Mitigation,
    Vitality,
    Regain,
    DodgeOdds,
}

impl Stat {
    /// Returns the snake_case name used by content and plugins.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Parses a stat name, mapping failures onto [`EffectError::UnknownStat`].
    pub fn parse(name: &str) -> Result<Self, EffectError> {
        name.parse().map_err(|_| EffectError::UnknownStat {
            name: name.to_string(),
        })
    }
}
