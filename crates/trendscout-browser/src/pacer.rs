//! Cancellable pacing delays.
//!
//! Every sleep in the crawl path goes through a [`Pacer`] so tests can swap in
//! [`InstantPacer`] and callers can abort through a `CancellationToken`.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use trendscout_core::{DelayRange, EngineConfig};

use crate::error::SessionError;

#[async_trait]
pub trait Pacer: Send + Sync + Debug {
    /// Sleep for this pacer's next delay.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] if `cancel` fires first.
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), SessionError>;
}

/// Sleeps a uniformly random duration drawn from a [`DelayRange`].
#[derive(Debug, Clone, Copy)]
pub struct JitterPacer {
    range: DelayRange,
}

impl JitterPacer {
    #[must_use]
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }

    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let ms = if self.range.min_ms() == self.range.max_ms() {
            self.range.min_ms()
        } else {
            rand::rng().random_range(self.range.min_ms()..=self.range.max_ms())
        };
        Duration::from_millis(ms)
    }
}

#[async_trait]
impl Pacer for JitterPacer {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        let delay = self.next_delay();
        if delay.is_zero() {
            return check_cancelled(cancel);
        }
        tokio::select! {
            () = cancel.cancelled() => Err(SessionError::Cancelled),
            () = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

/// Zero-delay pacer; still honours cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantPacer;

#[async_trait]
impl Pacer for InstantPacer {
    async fn wait(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        check_cancelled(cancel)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), SessionError> {
    if cancel.is_cancelled() {
        Err(SessionError::Cancelled)
    } else {
        Ok(())
    }
}

/// The full set of pacers used by sessions, drivers and the orchestrator.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Mandatory delay after every simulated interaction.
    pub action: Arc<dyn Pacer>,
    /// Between typed characters.
    pub keystroke: Arc<dyn Pacer>,
    /// After focusing an input, before the first keystroke.
    pub focus: Arc<dyn Pacer>,
    pub scroll_pause: Arc<dyn Pacer>,
    pub pointer_pause: Arc<dyn Pacer>,
    /// Between consecutive platforms in one crawl.
    pub platform_gap: Arc<dyn Pacer>,
    /// Between sub-community passes on the forum platform.
    pub pass_gap: Arc<dyn Pacer>,
    /// Between result-page polls while waiting for a marker.
    pub poll: Arc<dyn Pacer>,
}

impl Pacing {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let fixed = |min_ms, max_ms| -> Arc<dyn Pacer> {
            Arc::new(JitterPacer::new(
                DelayRange::new(min_ms, max_ms).unwrap_or(DelayRange::ZERO),
            ))
        };
        Pacing {
            action: Arc::new(JitterPacer::new(config.action_delay)),
            keystroke: Arc::new(JitterPacer::new(config.typing_delay)),
            focus: fixed(100, 300),
            scroll_pause: fixed(500, 1_500),
            pointer_pause: fixed(100, 500),
            platform_gap: Arc::new(JitterPacer::new(config.platform_delay)),
            pass_gap: Arc::new(JitterPacer::new(config.subcommunity_delay)),
            poll: fixed(400, 600),
        }
    }

    /// Every pacer replaced with [`InstantPacer`].
    #[must_use]
    pub fn instant() -> Self {
        let instant: Arc<dyn Pacer> = Arc::new(InstantPacer);
        Pacing {
            action: Arc::clone(&instant),
            keystroke: Arc::clone(&instant),
            focus: Arc::clone(&instant),
            scroll_pause: Arc::clone(&instant),
            pointer_pause: Arc::clone(&instant),
            platform_gap: Arc::clone(&instant),
            pass_gap: Arc::clone(&instant),
            poll: instant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_range() {
        let pacer = JitterPacer::new(DelayRange::new(50, 80).unwrap());
        for _ in 0..200 {
            let d = pacer.next_delay();
            assert!(
                d >= Duration::from_millis(50) && d <= Duration::from_millis(80),
                "delay out of range: {d:?}"
            );
        }
    }

    #[test]
    fn degenerate_range_is_constant() {
        let pacer = JitterPacer::new(DelayRange::new(25, 25).unwrap());
        assert_eq!(pacer.next_delay(), Duration::from_millis(25));
    }

    #[tokio::test(start_paused = true)]
    async fn jitter_pacer_sleeps_at_least_minimum() {
        let pacer = JitterPacer::new(DelayRange::new(3_000, 7_000).unwrap());
        let started = tokio::time::Instant::now();
        pacer.wait(&CancellationToken::new()).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3_000), "slept {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(7_000), "slept {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_wait() {
        let pacer = JitterPacer::new(DelayRange::new(60_000, 60_000).unwrap());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result = pacer.wait(&cancel).await;
        assert!(matches!(result, Err(SessionError::Cancelled)));
    }

    #[tokio::test]
    async fn instant_pacer_reports_prior_cancellation() {
        let cancel = CancellationToken::new();
        assert!(InstantPacer.wait(&cancel).await.is_ok());
        cancel.cancel();
        assert!(matches!(
            InstantPacer.wait(&cancel).await,
            Err(SessionError::Cancelled)
        ));
    }
}
