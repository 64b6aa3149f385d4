//! Cooperative pacing between handler invocations.
//!
//! The bus never cancels a slow handler. After each one it measures how long
//! the handler ran and how long it has been since the scheduler was last
//! given back control, and inserts a yield or a short sleep accordingly.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::BusConfig;
use crate::sync::lock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PaceAction {
    Continue,
    Yield,
    Pause,
}

#[derive(Debug)]
pub(crate) struct Pacer {
    soft: Duration,
    hard: Duration,
    pause: Duration,
    last_yield: Mutex<Instant>,
}

impl Pacer {
    pub(crate) fn new(config: &BusConfig) -> Self {
        Self {
            soft: config.soft_yield,
            hard: config.hard_yield,
            pause: config.hard_pause,
            last_yield: Mutex::new(Instant::now()),
        }
    }

    fn decide(&self, elapsed: Duration) -> PaceAction {
        let mut last_yield = lock(&self.last_yield);
        let action = if elapsed > self.hard {
            PaceAction::Pause
        } else if elapsed > self.soft || last_yield.elapsed() > self.soft {
            PaceAction::Yield
        } else {
            PaceAction::Continue
        };
        if action != PaceAction::Continue {
            *last_yield = Instant::now();
        }
        action
    }

    /// Called after a handler that ran for `elapsed`.
    pub(crate) async fn after(&self, elapsed: Duration) -> PaceAction {
        let action = self.decide(elapsed);
        match action {
            PaceAction::Pause => tokio::time::sleep(self.pause).await,
            PaceAction::Yield => tokio::task::yield_now().await,
            PaceAction::Continue => {}
        }
        action
    }

    /// Unconditional yield between chunks or fan-out batches.
    pub(crate) async fn breathe(&self) {
        *lock(&self.last_yield) = Instant::now();
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer() -> Pacer {
        Pacer::new(&BusConfig::default())
    }

    #[tokio::test]
    async fn fast_handlers_continue() {
        let pacer = pacer();
        assert_eq!(pacer.after(Duration::from_micros(50)).await, PaceAction::Continue);
    }

    #[tokio::test]
    async fn soft_threshold_yields() {
        let pacer = pacer();
        assert_eq!(pacer.after(Duration::from_millis(5)).await, PaceAction::Yield);
    }

    #[tokio::test]
    async fn hard_threshold_pauses() {
        let pacer = pacer();
        assert_eq!(pacer.after(Duration::from_millis(25)).await, PaceAction::Pause);
    }

    #[tokio::test]
    async fn long_gap_since_last_yield_yields() {
        let pacer = pacer();
        *lock(&pacer.last_yield) = Instant::now() - Duration::from_millis(10);
        assert_eq!(pacer.after(Duration::from_micros(10)).await, PaceAction::Yield);
        assert_eq!(pacer.after(Duration::from_micros(10)).await, PaceAction::Continue);
    }
}
