//! Deterministic in-memory pages.
//!
//! A [`ScriptedSite`] maps URL prefixes to fixed HTML. Pages record every
//! keystroke, submission and navigation so callers can drive the full session
//! and driver stack without launching a browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use trendscout_core::EngineConfig;

use crate::behavior::{BehaviorSettings, BehaviorSimulator};
use crate::error::SessionError;
use crate::pacer::Pacing;
use crate::page::BrowserPage;
use crate::pool::Identity;
use crate::session::{SessionFactory, StealthSession};

#[derive(Debug, Clone)]
enum Landing {
    Html(String),
    Hang,
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    prefix: String,
    landing: Landing,
    results: Option<String>,
}

/// URL-prefix routing table. The longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSite {
    routes: Vec<Route>,
}

impl ScriptedSite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn route_mut(&mut self, prefix: &str) -> &mut Route {
        if let Some(i) = self.routes.iter().position(|r| r.prefix == prefix) {
            return &mut self.routes[i];
        }
        self.routes.push(Route {
            prefix: prefix.to_string(),
            landing: Landing::Html(String::from("<html><body></body></html>")),
            results: None,
        });
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    /// Serve `html` when navigating to a URL starting with `prefix`.
    #[must_use]
    pub fn page(mut self, prefix: &str, html: impl Into<String>) -> Self {
        self.route_mut(prefix).landing = Landing::Html(html.into());
        self
    }

    /// Serve `html` after Enter is pressed on a page under `prefix`.
    #[must_use]
    pub fn results(mut self, prefix: &str, html: impl Into<String>) -> Self {
        self.route_mut(prefix).results = Some(html.into());
        self
    }

    /// Navigation under `prefix` never completes.
    #[must_use]
    pub fn hang(mut self, prefix: &str) -> Self {
        self.route_mut(prefix).landing = Landing::Hang;
        self
    }

    /// Navigation under `prefix` fails with a browser error carrying `message`.
    #[must_use]
    pub fn fail(mut self, prefix: &str, message: &str) -> Self {
        self.route_mut(prefix).landing = Landing::Fail(message.to_string());
        self
    }

    fn lookup(&self, url: &str) -> Option<&Route> {
        self.routes
            .iter()
            .filter(|r| url.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
    }
}

/// Counters shared by every page a factory creates.
#[derive(Debug, Default)]
pub struct ScriptedStats {
    created: AtomicUsize,
    closed: AtomicUsize,
    keystrokes: AtomicUsize,
    scrolls: AtomicUsize,
    pointer_moves: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    submissions: Mutex<Vec<String>>,
    identities: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedStats {
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sessions created but not yet closed.
    #[must_use]
    pub fn open(&self) -> usize {
        self.created().saturating_sub(self.closed())
    }

    /// Number of individual `type_str` calls across all pages.
    #[must_use]
    pub fn keystrokes(&self) -> usize {
        self.keystrokes.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pointer_moves(&self) -> usize {
        self.pointer_moves.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }

    /// Text that was in the focused input each time Enter was pressed.
    #[must_use]
    pub fn submissions(&self) -> Vec<String> {
        lock(&self.submissions).clone()
    }

    /// Identity labels sessions were created for.
    #[must_use]
    pub fn identities(&self) -> Vec<String> {
        lock(&self.identities).clone()
    }
}

#[derive(Debug, Default)]
struct PageState {
    url: String,
    html: String,
    typed: String,
    focused: bool,
    closed: bool,
}

/// A [`BrowserPage`] backed by a [`ScriptedSite`].
#[derive(Debug)]
pub struct ScriptedPage {
    site: Arc<ScriptedSite>,
    stats: Arc<ScriptedStats>,
    state: Mutex<PageState>,
}

impl ScriptedPage {
    #[must_use]
    pub fn new(site: Arc<ScriptedSite>, stats: Arc<ScriptedStats>) -> Self {
        stats.created.fetch_add(1, Ordering::SeqCst);
        Self {
            site,
            stats,
            state: Mutex::new(PageState {
                url: "about:blank".to_string(),
                ..PageState::default()
            }),
        }
    }
}

#[async_trait]
impl BrowserPage for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        lock(&self.stats.navigations).push(url.to_string());
        let landing = self.site.lookup(url).map(|r| r.landing.clone());
        match landing {
            Some(Landing::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            Some(Landing::Fail(message)) => Err(SessionError::from_cdp_message(message)),
            Some(Landing::Html(html)) => {
                let mut state = lock(&self.state);
                state.url = url.to_string();
                state.html = html;
                state.typed.clear();
                state.focused = false;
                Ok(())
            }
            None => Err(SessionError::Cdp(format!("net::ERR_NAME_NOT_RESOLVED at {url}"))),
        }
    }

    async fn html(&self) -> Result<String, SessionError> {
        Ok(lock(&self.state).html.clone())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok(lock(&self.state).url.clone())
    }

    async fn click(&self, selector: &str) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        let doc = scraper::Html::parse_document(&state.html);
        let parsed = scraper::Selector::parse(selector)
            .map_err(|e| SessionError::Cdp(format!("invalid selector {selector}: {e}")))?;
        if doc.select(&parsed).next().is_none() {
            return Err(SessionError::Cdp(format!("no node found for {selector}")));
        }
        state.focused = true;
        Ok(())
    }

    async fn type_str(&self, text: &str) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        if !state.focused {
            return Err(SessionError::Cdp("no focused element to type into".to_string()));
        }
        state.typed.push_str(text);
        self.stats.keystrokes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        if !state.focused {
            return Err(SessionError::Cdp("no focused element to submit".to_string()));
        }
        let typed = std::mem::take(&mut state.typed);
        lock(&self.stats.submissions).push(typed);
        if let Some(results) = self.site.lookup(&state.url).and_then(|r| r.results.clone()) {
            state.html = results;
        }
        Ok(())
    }

    async fn scroll_by(&self, _delta_y: i64) -> Result<(), SessionError> {
        self.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn move_pointer(&self, _x: f64, _y: f64) -> Result<(), SessionError> {
        self.stats.pointer_moves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), SessionError> {
        let mut state = lock(&self.state);
        if !state.closed {
            state.closed = true;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A [`SessionFactory`] producing [`ScriptedPage`] sessions.
#[derive(Debug)]
pub struct ScriptedSessionFactory {
    site: Arc<ScriptedSite>,
    stats: Arc<ScriptedStats>,
    pacing: Pacing,
    behavior: BehaviorSettings,
    page_load_timeout: Duration,
    pending_init_failures: AtomicUsize,
}

impl ScriptedSessionFactory {
    /// Factory with instant pacing, the default behavior probabilities and a
    /// 30s page-load timeout.
    #[must_use]
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site: Arc::new(site),
            stats: Arc::new(ScriptedStats::default()),
            pacing: Pacing::instant(),
            behavior: BehaviorSettings::from_config(&EngineConfig::default()),
            page_load_timeout: Duration::from_secs(30),
            pending_init_failures: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: BehaviorSettings) -> Self {
        self.behavior = behavior;
        self
    }

    /// The next `n` session launches fail with [`SessionError::BrowserInit`].
    #[must_use]
    pub fn failing_first(self, n: usize) -> Self {
        self.pending_init_failures.store(n, Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn stats(&self) -> Arc<ScriptedStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl SessionFactory for ScriptedSessionFactory {
    async fn create_session(&self, identity: &Identity) -> Result<StealthSession, SessionError> {
        lock(&self.stats.identities).push(identity.label());
        let failing = self
            .pending_init_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SessionError::BrowserInit(
                "scripted launch failure".to_string(),
            ));
        }
        let page = ScriptedPage::new(Arc::clone(&self.site), Arc::clone(&self.stats));
        let behavior = BehaviorSimulator::new(
            self.behavior,
            identity.fingerprint.viewport,
            self.pacing.clone(),
        );
        Ok(StealthSession::new(
            Box::new(page),
            behavior,
            self.page_load_timeout,
            identity.label(),
        ))
    }
}
