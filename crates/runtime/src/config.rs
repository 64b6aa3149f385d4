//! Runtime tuning: pacing thresholds, batch flush tiers and fan-out limits.
use std::env;
use std::time::Duration;

/// Configuration shared by the event bus, effect managers and passive registry.
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    pub bus: BusConfig,
    pub effects: EffectConfig,
}

impl RuntimeConfig {
    pub const fn new(bus: BusConfig, effects: EffectConfig) -> Self {
        Self { bus, effects }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables (all optional, milliseconds unless noted):
    /// - `BATTLE_SOFT_YIELD_MS` - Handler time before a cooperative yield (default: 4)
    /// - `BATTLE_HARD_YIELD_MS` - Handler time before a short sleep (default: 20)
    /// - `BATTLE_FLUSH_INTERVAL_MS` - Default batch flush interval (default: 16)
    /// - `BATTLE_BATCH_CHUNK` - Events per flush chunk, count (default: 100)
    /// - `BATTLE_SLOW_EVENT_MS` - Publish duration that logs a slow-event warning (default: 50)
    /// - `BATTLE_FANOUT_BATCH` - Effects per concurrent batch, count (default: 10)
    /// - `BATTLE_DOT_FANOUT` / `BATTLE_HOT_FANOUT` - Collection size that switches
    ///   over-time effects to concurrent processing, count (default: 20)
    /// - `BATTLE_MODIFIER_FANOUT` / `BATTLE_PASSIVE_FANOUT` - Same for modifiers and
    ///   turn-end passives, count (default: 15)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ms) = read_env::<u64>("BATTLE_SOFT_YIELD_MS") {
            config.bus.soft_yield = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_HARD_YIELD_MS") {
            config.bus.hard_yield = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_FLUSH_INTERVAL_MS") {
            config.bus.flush_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(size) = read_env::<usize>("BATTLE_BATCH_CHUNK") {
            config.bus.batch_chunk_size = size.max(1);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_SLOW_EVENT_MS") {
            config.bus.slow_event_threshold = Duration::from_millis(ms);
        }

        if let Some(size) = read_env::<usize>("BATTLE_FANOUT_BATCH") {
            config.effects.fanout_batch_size = size.max(1);
        }
        if let Some(limit) = read_env::<usize>("BATTLE_DOT_FANOUT") {
            config.effects.dot_fanout_threshold = limit;
        }
        if let Some(limit) = read_env::<usize>("BATTLE_HOT_FANOUT") {
            config.effects.hot_fanout_threshold = limit;
        }
        if let Some(limit) = read_env::<usize>("BATTLE_MODIFIER_FANOUT") {
            config.effects.modifier_fanout_threshold = limit;
        }
        if let Some(limit) = read_env::<usize>("BATTLE_PASSIVE_FANOUT") {
            config.effects.passive_fanout_threshold = limit;
        }

        config
    }
}

/// Event bus pacing and batching parameters.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Elapsed handler time that triggers a zero-cost yield.
    pub soft_yield: Duration,
    /// Elapsed handler time that triggers a short sleep instead.
    pub hard_yield: Duration,
    /// Length of the hard-threshold sleep.
    pub hard_pause: Duration,
    /// Flush interval with a light backlog (one frame).
    pub flush_interval: Duration,
    /// Flush interval once more than `medium_backlog` events are queued.
    pub medium_flush_interval: Duration,
    /// Flush interval once more than `fast_backlog` events are queued.
    pub fast_flush_interval: Duration,
    pub medium_backlog: usize,
    pub fast_backlog: usize,
    /// Events dispatched per chunk before a cooperative pause.
    pub batch_chunk_size: usize,
    /// Aggregate publish duration that logs a slow-event warning.
    pub slow_event_threshold: Duration,
    /// Duration samples kept per event name.
    pub metrics_window: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            soft_yield: Duration::from_millis(4),
            hard_yield: Duration::from_millis(20),
            hard_pause: Duration::from_millis(1),
            flush_interval: Duration::from_millis(16),
            medium_flush_interval: Duration::from_millis(8),
            fast_flush_interval: Duration::from_millis(4),
            medium_backlog: 50,
            fast_backlog: 100,
            batch_chunk_size: 100,
            slow_event_threshold: Duration::from_millis(50),
            metrics_window: 64,
        }
    }
}

impl BusConfig {
    /// Picks the flush interval for the given backlog.
    pub fn flush_interval_for(&self, queued: usize) -> Duration {
        if queued > self.fast_backlog {
            self.fast_flush_interval
        } else if queued > self.medium_backlog {
            self.medium_flush_interval
        } else {
            self.flush_interval
        }
    }
}

/// Collection sizes above which effect processing fans out concurrently.
#[derive(Clone, Debug)]
pub struct EffectConfig {
    pub dot_fanout_threshold: usize,
    pub hot_fanout_threshold: usize,
    pub modifier_fanout_threshold: usize,
    pub passive_fanout_threshold: usize,
    /// Members processed together per concurrent batch.
    pub fanout_batch_size: usize,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            dot_fanout_threshold: 20,
            hot_fanout_threshold: 20,
            modifier_fanout_threshold: 15,
            passive_fanout_threshold: 15,
            fanout_batch_size: 10,
        }
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_interval_tiers() {
        let config = BusConfig::default();
        assert_eq!(config.flush_interval_for(0), Duration::from_millis(16));
        assert_eq!(config.flush_interval_for(50), Duration::from_millis(16));
        assert_eq!(config.flush_interval_for(51), Duration::from_millis(8));
        assert_eq!(config.flush_interval_for(100), Duration::from_millis(8));
        assert_eq!(config.flush_interval_for(101), Duration::from_millis(4));
    }
}
