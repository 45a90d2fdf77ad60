//! Human-like interaction between crawl steps.

use rand::Rng;
use tokio_util::sync::CancellationToken;
use trendscout_core::EngineConfig;

use crate::error::SessionError;
use crate::fingerprint::ViewportSize;
use crate::pacer::Pacing;
use crate::page::BrowserPage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorSettings {
    pub scroll_probability: f64,
    pub pointer_probability: f64,
}

impl BehaviorSettings {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            scroll_probability: config.scroll_probability,
            pointer_probability: config.pointer_probability,
        }
    }
}

/// One randomly drawn round of interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub scroll_by: Option<i64>,
    pub pointer_to: Option<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct BehaviorSimulator {
    settings: BehaviorSettings,
    viewport: ViewportSize,
    pacing: Pacing,
}

impl BehaviorSimulator {
    #[must_use]
    pub fn new(settings: BehaviorSettings, viewport: ViewportSize, pacing: Pacing) -> Self {
        Self {
            settings,
            viewport,
            pacing,
        }
    }

    #[must_use]
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Draw the next gesture. Scroll distance is 100–500px; the pointer stays
    /// 50px clear of the viewport edges.
    #[must_use]
    pub fn plan(&self) -> Gesture {
        let mut rng = rand::rng();
        let scroll_by = rng
            .random_bool(self.settings.scroll_probability.clamp(0.0, 1.0))
            .then(|| rng.random_range(100..=500));
        let pointer_to = rng
            .random_bool(self.settings.pointer_probability.clamp(0.0, 1.0))
            .then(|| {
                (
                    random_coordinate(&mut rng, self.viewport.width),
                    random_coordinate(&mut rng, self.viewport.height),
                )
            });
        Gesture {
            scroll_by,
            pointer_to,
        }
    }

    /// Perform one gesture, then always wait the mandatory action delay.
    ///
    /// Scroll and pointer failures are logged and ignored; only cancellation
    /// aborts.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] if `cancel` fires during a pause.
    pub async fn perform(
        &self,
        page: &dyn BrowserPage,
        cancel: &CancellationToken,
    ) -> Result<Gesture, SessionError> {
        let gesture = self.plan();

        if let Some(delta) = gesture.scroll_by {
            if let Err(e) = page.scroll_by(delta).await {
                tracing::debug!(error = %e, "simulated scroll failed");
            }
            self.pacing.scroll_pause.wait(cancel).await?;
        }

        if let Some((x, y)) = gesture.pointer_to {
            if let Err(e) = page.move_pointer(x, y).await {
                tracing::debug!(error = %e, "simulated pointer move failed");
            }
            self.pacing.pointer_pause.wait(cancel).await?;
        }

        self.pacing.action.wait(cancel).await?;
        Ok(gesture)
    }
}

fn random_coordinate<R: Rng>(rng: &mut R, extent: u32) -> f64 {
    let extent = f64::from(extent);
    if extent <= 100.0 {
        extent / 2.0
    } else {
        rng.random_range(50.0..=extent - 50.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator(scroll: f64, pointer: f64) -> BehaviorSimulator {
        BehaviorSimulator::new(
            BehaviorSettings {
                scroll_probability: scroll,
                pointer_probability: pointer,
            },
            ViewportSize {
                width: 1366,
                height: 768,
            },
            Pacing::instant(),
        )
    }

    #[test]
    fn certain_probabilities_always_act() {
        let sim = simulator(1.0, 1.0);
        for _ in 0..50 {
            let g = sim.plan();
            let dy = g.scroll_by.unwrap();
            assert!((100..=500).contains(&dy));
            let (x, y) = g.pointer_to.unwrap();
            assert!((50.0..=1316.0).contains(&x));
            assert!((50.0..=718.0).contains(&y));
        }
    }

    #[test]
    fn zero_probabilities_never_act() {
        let sim = simulator(0.0, 0.0);
        for _ in 0..50 {
            assert_eq!(
                sim.plan(),
                Gesture {
                    scroll_by: None,
                    pointer_to: None
                }
            );
        }
    }

    #[test]
    fn tiny_viewport_centres_pointer() {
        let mut rng = rand::rng();
        assert!((random_coordinate(&mut rng, 80) - 40.0).abs() < f64::EPSILON);
    }
}
