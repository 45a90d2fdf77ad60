//! Platform driver contract and the state machine that runs it.
//!
//! Every driver goes `Idle → Navigated → QueryEntered → ResultsLoaded →
//! Extracted`, or ends in `Failed` from any state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use trendscout_browser::{CancellationToken, Pacer, SessionError, StealthSession};
use trendscout_core::{ContentRecord, Platform, TimeRange};

use crate::block::detect_block;
use crate::error::PlatformSearchError;

/// One navigate-type-wait-extract cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPass {
    /// Short name for logs, e.g. the sub-community.
    pub label: String,
    pub landing_url: String,
    /// Exactly what gets typed into the search box.
    pub typed_query: String,
    pub limit: usize,
}

/// A per-platform scraper driven through a [`StealthSession`].
pub trait PlatformDriver: Send + Sync {
    fn platform(&self) -> Platform;

    /// Cap on records from one run, across all passes.
    fn limit(&self) -> usize;

    /// The passes to run for `query`. Most platforms use a single pass.
    fn passes(&self, query: &str, time_range: TimeRange, now: DateTime<Utc>) -> Vec<SearchPass>;

    /// Candidate selectors for the search input, most specific first.
    fn search_inputs(&self) -> &'static [&'static str];

    /// Candidate selectors whose presence means results have rendered.
    fn result_markers(&self) -> &'static [&'static str];

    /// Selectors meaning the search ran but found nothing.
    fn empty_markers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Extra block-page markers specific to this platform.
    fn block_markers(&self) -> &'static [&'static str] {
        &[]
    }

    /// Parse a results page into records, at most `pass.limit`.
    fn extract(&self, html: &str, pass: &SearchPass, now: DateTime<Utc>) -> Vec<ContentRecord>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Navigated,
    QueryEntered,
    ResultsLoaded,
    Extracted,
    Failed,
}

impl DriverState {
    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: DriverState) -> bool {
        use DriverState::{Extracted, Failed, Idle, Navigated, QueryEntered, ResultsLoaded};
        matches!(
            (self, next),
            (Idle, Navigated)
                | (Navigated, QueryEntered)
                | (QueryEntered, ResultsLoaded | Extracted)
                | (ResultsLoaded, Extracted)
                | (Idle | Navigated | QueryEntered | ResultsLoaded, Failed)
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DriverState::Extracted | DriverState::Failed)
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Idle => "idle",
            DriverState::Navigated => "navigated",
            DriverState::QueryEntered => "query_entered",
            DriverState::ResultsLoaded => "results_loaded",
            DriverState::Extracted => "extracted",
            DriverState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Inputs shared by every pass of one driver run.
#[derive(Debug, Clone)]
pub struct DriverContext {
    /// Pause between passes.
    pub pass_gap: Arc<dyn Pacer>,
    /// How long to wait for a results marker after submitting.
    pub results_timeout: Duration,
    pub now: DateTime<Utc>,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
enum WaitStop {
    Empty,
    Blocked(String),
}

struct Machine {
    platform: Platform,
    label: String,
    state: DriverState,
}

impl Machine {
    fn advance(&mut self, next: DriverState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal driver transition {} -> {}",
            self.state,
            next
        );
        tracing::debug!(
            platform = %self.platform,
            pass = %self.label,
            from = %self.state,
            to = %next,
            "driver transition"
        );
        self.state = next;
    }

    fn fail(&mut self, err: PlatformSearchError) -> PlatformSearchError {
        tracing::debug!(
            platform = %self.platform,
            pass = %self.label,
            state = %self.state,
            error = %err,
            "driver failed"
        );
        self.advance(DriverState::Failed);
        err
    }
}

/// Run every pass of `driver` in `session`, appending to `records` as each
/// pass completes.
///
/// Records are unique by URL and capped at [`PlatformDriver::limit`]. Records
/// from finished passes stay in `records` if the run is dropped part-way.
/// A failed pass is logged and skipped when other passes remain; the run only
/// fails when no pass succeeded.
///
/// # Errors
///
/// Returns the last pass's [`PlatformSearchError`] if every pass failed, or
/// [`PlatformSearchError::Cancelled`] immediately on cancellation.
pub async fn run_driver(
    driver: &dyn PlatformDriver,
    session: &StealthSession,
    query: &str,
    time_range: TimeRange,
    ctx: &DriverContext,
    records: &mut Vec<ContentRecord>,
) -> Result<(), PlatformSearchError> {
    let platform = driver.platform();
    let limit = driver.limit();
    let passes = driver.passes(query, time_range, ctx.now);
    let mut succeeded = 0usize;
    let mut last_err = None;

    for (i, pass) in passes.iter().enumerate() {
        if records.len() >= limit {
            tracing::debug!(
                platform = %platform,
                limit,
                "result limit reached; skipping remaining passes"
            );
            break;
        }
        if i > 0 {
            ctx.pass_gap
                .wait(&ctx.cancel)
                .await
                .map_err(|e| PlatformSearchError::from_session(platform, e))?;
        }
        match run_pass(driver, session, pass, ctx).await {
            Ok(found) => {
                tracing::debug!(
                    platform = %platform,
                    pass = %pass.label,
                    count = found.len(),
                    "pass complete"
                );
                succeeded += 1;
                push_unique(records, found, limit);
            }
            Err(PlatformSearchError::Cancelled) => return Err(PlatformSearchError::Cancelled),
            Err(e) if passes.len() > 1 => {
                tracing::warn!(
                    platform = %platform,
                    pass = %pass.label,
                    error = %e,
                    "pass failed; continuing with remaining passes"
                );
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    match last_err {
        Some(e) if succeeded == 0 => Err(e),
        _ => Ok(()),
    }
}

async fn run_pass(
    driver: &dyn PlatformDriver,
    session: &StealthSession,
    pass: &SearchPass,
    ctx: &DriverContext,
) -> Result<Vec<ContentRecord>, PlatformSearchError> {
    let platform = driver.platform();
    let session_err = |e: SessionError| PlatformSearchError::from_session(platform, e);
    let mut machine = Machine {
        platform,
        label: pass.label.clone(),
        state: DriverState::Idle,
    };

    // Idle -> Navigated
    if let Err(e) = session.navigate(&pass.landing_url, &ctx.cancel).await {
        return Err(machine.fail(session_err(e)));
    }
    machine.advance(DriverState::Navigated);
    if let Err(e) = session.simulate(&ctx.cancel).await {
        return Err(machine.fail(session_err(e)));
    }

    // Navigated -> QueryEntered
    match session
        .type_into(driver.search_inputs(), &pass.typed_query, &ctx.cancel)
        .await
    {
        Ok(_) => {}
        Err(SessionError::SelectorExhausted { tried }) => {
            let err = match blocked_reason(driver, session).await {
                Some(reason) => PlatformSearchError::BlockedOrChallenged { platform, reason },
                None => PlatformSearchError::SelectorExhausted { platform, tried },
            };
            return Err(machine.fail(err));
        }
        Err(e) => return Err(machine.fail(session_err(e))),
    }
    if let Err(e) = session.submit().await {
        return Err(machine.fail(session_err(e)));
    }
    machine.advance(DriverState::QueryEntered);

    // QueryEntered -> ResultsLoaded
    let url = session.current_url().await.unwrap_or_default();
    let block_markers = driver.block_markers();
    let empty_markers = driver.empty_markers();
    let waited = session
        .wait_for(
            driver.result_markers(),
            ctx.results_timeout,
            &ctx.cancel,
            |html| {
                if let Some(reason) = detect_block(html, &url, block_markers) {
                    return Some(WaitStop::Blocked(reason));
                }
                has_any(html, empty_markers).then_some(WaitStop::Empty)
            },
        )
        .await;
    match waited {
        Ok(Ok(found)) => {
            tracing::debug!(
                platform = %platform,
                candidate = %found.candidate,
                matched = found.elements.len(),
                "results marker found"
            );
        }
        Ok(Err(WaitStop::Empty)) => {
            machine.advance(DriverState::Extracted);
            return Ok(Vec::new());
        }
        Ok(Err(WaitStop::Blocked(reason))) => {
            return Err(machine.fail(PlatformSearchError::BlockedOrChallenged { platform, reason }));
        }
        Err(e) => return Err(machine.fail(session_err(e))),
    }
    machine.advance(DriverState::ResultsLoaded);
    if let Err(e) = session.simulate(&ctx.cancel).await {
        return Err(machine.fail(session_err(e)));
    }

    // ResultsLoaded -> Extracted
    let html = match session.html().await {
        Ok(html) => html,
        Err(e) => return Err(machine.fail(session_err(e))),
    };
    let mut records = driver.extract(&html, pass, ctx.now);
    records.truncate(pass.limit);
    machine.advance(DriverState::Extracted);
    Ok(records)
}

async fn blocked_reason(driver: &dyn PlatformDriver, session: &StealthSession) -> Option<String> {
    let html = session.html().await.ok()?;
    let url = session.current_url().await.unwrap_or_default();
    detect_block(&html, &url, driver.block_markers())
}

fn has_any(html: &str, selectors: &[&str]) -> bool {
    if selectors.is_empty() {
        return false;
    }
    let doc = scraper::Html::parse_document(html);
    selectors.iter().any(|s| {
        scraper::Selector::parse(s)
            .map(|sel| doc.select(&sel).next().is_some())
            .unwrap_or(false)
    })
}

/// Append records whose URL is not already present, stopping at `limit`.
fn push_unique(records: &mut Vec<ContentRecord>, found: Vec<ContentRecord>, limit: usize) {
    for record in found {
        if records.len() >= limit {
            break;
        }
        if !records.iter().any(|r| r.url == record.url) {
            records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions() {
        use DriverState::*;
        assert!(Idle.can_transition_to(Navigated));
        assert!(Navigated.can_transition_to(QueryEntered));
        assert!(QueryEntered.can_transition_to(ResultsLoaded));
        assert!(QueryEntered.can_transition_to(Extracted));
        assert!(ResultsLoaded.can_transition_to(Extracted));
        for s in [Idle, Navigated, QueryEntered, ResultsLoaded] {
            assert!(s.can_transition_to(Failed), "{s} -> failed");
        }
    }

    #[test]
    fn illegal_transitions() {
        use DriverState::*;
        assert!(!Idle.can_transition_to(QueryEntered));
        assert!(!Navigated.can_transition_to(ResultsLoaded));
        assert!(!Extracted.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Idle));
        assert!(Extracted.is_terminal() && Failed.is_terminal());
    }

    fn record(url: &str) -> ContentRecord {
        ContentRecord {
            title: url.to_string(),
            content: String::new(),
            url: url.to_string(),
            author: String::new(),
            metrics: trendscout_core::PlatformMetrics::Google { ranking: 1 },
            confidence_score: 0.8,
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn push_unique_skips_seen_urls_and_stops_at_limit() {
        let mut records = vec![record("https://a.test/")];
        push_unique(
            &mut records,
            vec![
                record("https://a.test/"),
                record("https://b.test/"),
                record("https://c.test/"),
                record("https://d.test/"),
            ],
            3,
        );
        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test/", "https://b.test/", "https://c.test/"]);
    }

    #[test]
    fn empty_marker_detection() {
        let html = "<div id=\"noresults\">nothing</div>";
        assert!(has_any(html, &["#noresults"]));
        assert!(!has_any(html, &[]));
        assert!(!has_any(html, &[".thing"]));
    }
}
