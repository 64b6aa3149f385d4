//! Diminishing returns for stat buffs.
//!
//! Each configured stat carries a step curve: every `threshold` of value above
//! `base_offset` divides further gains by `scaling_factor`.
//!
//! ```text
//! effective = max(0, current - base_offset)
//! steps     = floor(effective / threshold + ε)
//! factor    = clamp(1 / scaling_factor^steps, 1e-6, 1.0)
//! ```
//!
//! Unconfigured stats are never curved.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::stats::Stat;

/// Lowest effectiveness a curve can produce; overflow collapses here.
pub const MIN_EFFECTIVENESS: f64 = 1e-6;

/// Added before flooring so that ratios landing a rounding error below an
/// integer (e.g. `0.3 / 0.1`) still count the step.
const STEP_EPSILON: f64 = 1e-9;

/// Curve parameters for a single stat.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiminishingCurve {
    pub threshold: f64,
    pub scaling_factor: f64,
    pub base_offset: f64,
}

impl DiminishingCurve {
    pub const fn new(threshold: f64, scaling_factor: f64, base_offset: f64) -> Self {
        Self {
            threshold,
            scaling_factor,
            base_offset,
        }
    }

    fn validate(&self, stat: Stat) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                stat,
                value: self.threshold,
            });
        }
        if !self.scaling_factor.is_finite() || self.scaling_factor < 1.0 {
            return Err(ConfigError::InvalidScalingFactor {
                stat,
                value: self.scaling_factor,
            });
        }
        if !self.base_offset.is_finite() {
            return Err(ConfigError::InvalidBaseOffset {
                stat,
                value: self.base_offset,
            });
        }
        Ok(())
    }

    /// Number of whole thresholds `current_value` sits above the offset.
    pub fn steps(&self, current_value: f64) -> f64 {
        // f64::max discards NaN, so a NaN value counts as zero.
        let effective = (current_value - self.base_offset).max(0.0);
        ((effective / self.threshold) + STEP_EPSILON).floor()
    }

    /// Effectiveness multiplier in `[MIN_EFFECTIVENESS, 1.0]`.
    pub fn factor(&self, current_value: f64) -> f64 {
        let steps = self.steps(current_value);
        if !steps.is_finite() {
            return MIN_EFFECTIVENESS;
        }
        if steps <= 0.0 {
            return 1.0;
        }

        let divisor = self.scaling_factor.powf(steps);
        if !divisor.is_finite() || divisor <= 0.0 {
            return MIN_EFFECTIVENESS;
        }
        (1.0 / divisor).clamp(MIN_EFFECTIVENESS, 1.0)
    }
}

/// Default curve table.
const STANDARD_CURVES: &[(Stat, DiminishingCurve)] = &[
    (Stat::MaxHp, DiminishingCurve::new(5000.0, 2.0, 0.0)),
    (Stat::Atk, DiminishingCurve::new(500.0, 2.0, 0.0)),
    (Stat::Defense, DiminishingCurve::new(500.0, 2.0, 0.0)),
    (Stat::CritRate, DiminishingCurve::new(0.5, 2.0, 0.0)),
    (Stat::CritDamage, DiminishingCurve::new(5.0, 2.0, 2.0)),
    (Stat::EffectHitRate, DiminishingCurve::new(0.5, 2.0, 0.0)),
    (Stat::EffectResistance, DiminishingCurve::new(0.5, 2.0, 0.0)),
    (Stat::Mitigation, DiminishingCurve::new(0.25, 5.0, 1.0)),
    (Stat::Vitality, DiminishingCurve::new(0.25, 5.0, 1.0)),
    (Stat::DodgeOdds, DiminishingCurve::new(0.25, 2.0, 0.0)),
];

/// Validated table of per-stat curves.
#[derive(Clone, Debug, PartialEq)]
pub struct DiminishingReturns {
    curves: BTreeMap<Stat, DiminishingCurve>,
}

impl DiminishingReturns {
    /// Builds a table, rejecting the first invalid entry.
    pub fn new(
        entries: impl IntoIterator<Item = (Stat, DiminishingCurve)>,
    ) -> Result<Self, ConfigError> {
        let mut curves = BTreeMap::new();
        for (stat, curve) in entries {
            curve.validate(stat)?;
            curves.insert(stat, curve);
        }
        Ok(Self { curves })
    }

    /// The built-in table used when no custom one is supplied.
    pub fn standard() -> Self {
        Self {
            curves: STANDARD_CURVES.iter().copied().collect(),
        }
    }

    /// A table with no curves; every factor is `1.0`.
    pub fn disabled() -> Self {
        Self {
            curves: BTreeMap::new(),
        }
    }

    pub fn curve(&self, stat: Stat) -> Option<&DiminishingCurve> {
        self.curves.get(&stat)
    }

    pub fn is_configured(&self, stat: Stat) -> bool {
        self.curves.contains_key(&stat)
    }

    /// Effectiveness of a further buff to `stat` at `current_value`.
    pub fn calculate(&self, stat: Stat, current_value: f64) -> f64 {
        self.curves
            .get(&stat)
            .map_or(1.0, |curve| curve.factor(current_value))
    }
}

impl Default for DiminishingReturns {
    fn default() -> Self {
        Self::standard()
    }
}

/// Free-function form of [`DiminishingReturns::calculate`].
pub fn calculate_diminishing_returns(
    table: &DiminishingReturns,
    stat: Stat,
    current_value: f64,
) -> f64 {
    table.calculate(stat, current_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    fn atk_table() -> DiminishingReturns {
        DiminishingReturns::new([(Stat::Atk, DiminishingCurve::new(100.0, 4.0, 0.0))]).unwrap()
    }

    #[test]
    fn standard_table_is_valid() {
        let rebuilt = DiminishingReturns::new(STANDARD_CURVES.iter().copied()).unwrap();
        assert_eq!(rebuilt, DiminishingReturns::standard());
    }

    #[test]
    fn unconfigured_stat_is_never_curved() {
        let table = atk_table();
        assert_eq!(table.calculate(Stat::Regain, 1e12), 1.0);
        assert_eq!(DiminishingReturns::disabled().calculate(Stat::Atk, 1e12), 1.0);
    }

    #[test]
    fn below_first_threshold_is_full_strength() {
        let table = atk_table();
        assert_eq!(table.calculate(Stat::Atk, 0.0), 1.0);
        assert_eq!(table.calculate(Stat::Atk, 99.0), 1.0);
        assert_eq!(table.calculate(Stat::Atk, -50.0), 1.0);
    }

    #[test]
    fn each_threshold_divides_by_scaling_factor() {
        let table = atk_table();
        assert_eq!(table.calculate(Stat::Atk, 100.0), 0.25);
        assert_eq!(table.calculate(Stat::Atk, 250.0), 0.0625);
    }

    #[test]
    fn free_function_reads_the_table() {
        let table = atk_table();
        assert_eq!(calculate_diminishing_returns(&table, Stat::Atk, 50.0), 1.0);
        assert_eq!(calculate_diminishing_returns(&table, Stat::Atk, 200.0), 0.0625);
        assert_eq!(calculate_diminishing_returns(&table, Stat::Defense, 1e6), 1.0);
    }

    #[test]
    fn base_offset_shifts_the_curve() {
        let table =
            DiminishingReturns::new([(Stat::CritDamage, DiminishingCurve::new(5.0, 2.0, 2.0))])
                .unwrap();
        assert_eq!(table.calculate(Stat::CritDamage, 6.9), 1.0);
        assert_eq!(table.calculate(Stat::CritDamage, 7.0), 0.5);
    }

    #[test]
    fn boundary_rounding_still_counts_the_step() {
        let table =
            DiminishingReturns::new([(Stat::CritRate, DiminishingCurve::new(0.1, 2.0, 0.0))])
                .unwrap();
        // 0.3 / 0.1 lands just below 3.0 in f64.
        assert_eq!(table.calculate(Stat::CritRate, 0.3), 0.125);
    }

    #[test]
    fn overflow_degrades_to_floor() {
        let table = atk_table();
        assert_eq!(table.calculate(Stat::Atk, 1e300), MIN_EFFECTIVENESS);
        assert_eq!(table.calculate(Stat::Atk, f64::INFINITY), MIN_EFFECTIVENESS);
    }

    #[test]
    fn invalid_entries_are_rejected() {
        let err = DiminishingReturns::new([(Stat::Atk, DiminishingCurve::new(0.0, 2.0, 0.0))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThreshold { .. }));

        let err = DiminishingReturns::new([(Stat::Atk, DiminishingCurve::new(10.0, 0.5, 0.0))])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScalingFactor { .. }));

        let err =
            DiminishingReturns::new([(Stat::Atk, DiminishingCurve::new(10.0, 2.0, f64::NAN))])
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseOffset { .. }));
    }

    proptest! {
        #[test]
        fn factor_is_monotonic_non_increasing(a in 0.0f64..1e7, b in 0.0f64..1e7) {
            let table = DiminishingReturns::standard();
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            for stat in Stat::iter() {
                prop_assert!(table.calculate(stat, high) <= table.calculate(stat, low));
            }
        }

        #[test]
        fn factor_stays_in_range(value in proptest::num::f64::ANY) {
            let table = DiminishingReturns::standard();
            for stat in Stat::iter() {
                let factor = table.calculate(stat, value);
                prop_assert!((MIN_EFFECTIVENESS..=1.0).contains(&factor));
            }
        }

        #[test]
        fn unconfigured_is_always_one(value in proptest::num::f64::ANY) {
            prop_assert_eq!(DiminishingReturns::standard().calculate(Stat::Regain, value), 1.0);
        }
    }
}
