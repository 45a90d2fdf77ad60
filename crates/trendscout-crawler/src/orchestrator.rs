//! Sequential multi-platform crawl.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use trendscout_browser::{
    CancellationToken, Identity, IdentityPool, Pacing, SessionFactory, StealthSession,
};
use trendscout_core::{ContentRecord, EngineConfig, Platform, TimeRange};

use crate::driver::{run_driver, DriverContext, PlatformDriver};
use crate::drivers::configured_drivers;
use crate::error::{CrawlError, PlatformSearchError};
use crate::retry::retry_with_backoff;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// What happened on one platform's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformOutcome {
    pub platform: Platform,
    /// Records contributed; zero on failure.
    pub count: usize,
    /// Display form of the failure, if the turn failed.
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl PlatformOutcome {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Records from one query across every configured platform.
#[derive(Debug, Clone)]
pub struct CrawlBatch {
    pub query: String,
    pub time_range: TimeRange,
    pub records: Vec<ContentRecord>,
    pub outcomes: Vec<PlatformOutcome>,
}

/// Runs platform drivers one at a time, each in its own fresh session.
pub struct CrawlOrchestrator {
    factory: Arc<dyn SessionFactory>,
    pool: Arc<IdentityPool>,
    drivers: Vec<Box<dyn PlatformDriver>>,
    pacing: Pacing,
    driver_budget: Duration,
    results_timeout: Duration,
    session_init_attempts: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for CrawlOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlOrchestrator")
            .field("platforms", &self.platforms())
            .field("driver_budget", &self.driver_budget)
            .field("session_init_attempts", &self.session_init_attempts)
            .finish_non_exhaustive()
    }
}

impl CrawlOrchestrator {
    /// Orchestrator for every platform in `config.platforms`.
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        factory: Arc<dyn SessionFactory>,
        pool: Arc<IdentityPool>,
        pacing: Pacing,
    ) -> Self {
        Self {
            factory,
            pool,
            drivers: configured_drivers(config),
            pacing,
            driver_budget: config.driver_budget(),
            results_timeout: config.page_load_timeout(),
            session_init_attempts: config.session_init_attempts,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Replace the driver list, e.g. to crawl a subset of platforms.
    #[must_use]
    pub fn with_drivers(mut self, drivers: Vec<Box<dyn PlatformDriver>>) -> Self {
        self.drivers = drivers;
        self
    }

    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    #[must_use]
    pub fn platforms(&self) -> Vec<Platform> {
        self.drivers.iter().map(|d| d.platform()).collect()
    }

    #[must_use]
    pub fn pool(&self) -> &IdentityPool {
        &self.pool
    }

    #[must_use]
    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }

    /// Search every configured platform for `query`, strictly one after another.
    ///
    /// A failing platform is logged and skipped. The platform gap is awaited
    /// between consecutive platforms. Records come back ordered by confidence,
    /// highest first; ties keep platform order.
    ///
    /// # Errors
    ///
    /// [`CrawlError::EmptyBatch`] when no platform produced a record, or
    /// [`CrawlError::Cancelled`] if `cancel` fires.
    pub async fn search_all_platforms(
        &self,
        query: &str,
        time_range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<CrawlBatch, CrawlError> {
        let mut records = Vec::new();
        let mut outcomes = Vec::with_capacity(self.drivers.len());

        for (i, driver) in self.drivers.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }
            if i > 0 && self.pacing.platform_gap.wait(cancel).await.is_err() {
                return Err(CrawlError::Cancelled);
            }

            let platform = driver.platform();
            let started = Instant::now();
            match self
                .run_platform(driver.as_ref(), query, time_range, cancel)
                .await
            {
                Ok(found) => {
                    tracing::info!(
                        platform = %platform,
                        query,
                        count = found.len(),
                        "platform search complete"
                    );
                    outcomes.push(PlatformOutcome {
                        platform,
                        count: found.len(),
                        error: None,
                        elapsed: started.elapsed(),
                    });
                    records.extend(found);
                }
                Err(PlatformSearchError::Cancelled) => return Err(CrawlError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        platform = %platform,
                        query,
                        error = %e,
                        "platform search failed; continuing"
                    );
                    outcomes.push(PlatformOutcome {
                        platform,
                        count: 0,
                        error: Some(e.to_string()),
                        elapsed: started.elapsed(),
                    });
                }
            }
        }

        if records.is_empty() {
            return Err(CrawlError::EmptyBatch {
                query: query.to_string(),
            });
        }
        records.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
        Ok(CrawlBatch {
            query: query.to_string(),
            time_range,
            records,
            outcomes,
        })
    }

    /// One platform's turn: launch, drive within the budget, always close.
    ///
    /// Running out of budget after some passes finished keeps their records.
    async fn run_platform(
        &self,
        driver: &dyn PlatformDriver,
        query: &str,
        time_range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentRecord>, PlatformSearchError> {
        let platform = driver.platform();
        let started = Instant::now();
        let (session, identity) = retry_with_backoff(
            self.session_init_attempts,
            self.retry_backoff,
            cancel,
            |attempt| self.launch(platform, attempt),
        )
        .await?;

        let ctx = DriverContext {
            pass_gap: Arc::clone(&self.pacing.pass_gap),
            results_timeout: self.results_timeout,
            now: Utc::now(),
            cancel: cancel.clone(),
        };
        let budget = self.driver_budget;
        let mut collected = Vec::new();
        let raced = tokio::select! {
            () = cancel.cancelled() => None,
            outcome = tokio::time::timeout(
                budget,
                run_driver(driver, &session, query, time_range, &ctx, &mut collected),
            ) => Some(outcome),
        };
        session.close().await;

        let result = match raced {
            None => Err(PlatformSearchError::Cancelled),
            Some(Ok(Ok(()))) => Ok(collected),
            Some(Ok(Err(e))) => Err(e),
            Some(Err(_)) if !collected.is_empty() => {
                tracing::warn!(
                    platform = %platform,
                    budget_secs = budget.as_secs(),
                    kept = collected.len(),
                    "driver budget exceeded; keeping records from finished passes"
                );
                Ok(collected)
            }
            Some(Err(_)) => Err(PlatformSearchError::DriverBudgetExceeded { platform, budget }),
        };

        if let Some(lease) = &identity.proxy {
            match &result {
                Ok(_) => self.pool.report_success(lease.id, started.elapsed()),
                Err(e) if e.burns_identity() => self.pool.report_failure(lease.id),
                Err(_) => {}
            }
        }
        result
    }

    async fn launch(
        &self,
        platform: Platform,
        attempt: u32,
    ) -> Result<(StealthSession, Identity), PlatformSearchError> {
        let identity = self.pool.acquire();
        tracing::debug!(
            platform = %platform,
            attempt,
            identity = %identity.label(),
            "launching session"
        );
        match self.factory.create_session(&identity).await {
            Ok(session) => Ok((session, identity)),
            Err(e) => {
                let err = PlatformSearchError::from_session(platform, e);
                if let Some(lease) = identity.proxy.as_ref().filter(|_| err.burns_identity()) {
                    self.pool.report_failure(lease.id);
                }
                Err(err)
            }
        }
    }
}
