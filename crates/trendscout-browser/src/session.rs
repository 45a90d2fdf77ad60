//! Scoped stealth browser sessions.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::behavior::BehaviorSimulator;
use crate::error::SessionError;
use crate::page::BrowserPage;
use crate::pool::Identity;
use crate::selector;

/// Creates sessions bound to an identity.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Launch a browser configured for `identity`, with stealth countermeasures
    /// already injected.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::BrowserInit`] or [`SessionError::Proxy`] if the
    /// browser cannot be brought up with this identity.
    async fn create_session(&self, identity: &Identity) -> Result<StealthSession, SessionError>;
}

/// Which selector candidate matched, and what it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorMatch {
    pub candidate: String,
    pub index: usize,
    /// Outer HTML of every matched element.
    pub elements: Vec<String>,
}

/// A browser page plus the behavior simulator bound to it.
///
/// Callers must [`close`](StealthSession::close) the session on every exit
/// path.
pub struct StealthSession {
    id: Uuid,
    page: Box<dyn BrowserPage>,
    behavior: BehaviorSimulator,
    page_load_timeout: Duration,
    identity_label: String,
}

impl std::fmt::Debug for StealthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthSession")
            .field("id", &self.id)
            .field("identity", &self.identity_label)
            .field("page_load_timeout", &self.page_load_timeout)
            .finish_non_exhaustive()
    }
}

impl StealthSession {
    #[must_use]
    pub fn new(
        page: Box<dyn BrowserPage>,
        behavior: BehaviorSimulator,
        page_load_timeout: Duration,
        identity_label: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            page,
            behavior,
            page_load_timeout,
            identity_label: identity_label.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn behavior(&self) -> &BehaviorSimulator {
        &self.behavior
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        self.page_load_timeout
    }

    /// Navigate to `url`, bounded by the page-load timeout.
    ///
    /// # Errors
    ///
    /// [`SessionError::NavigationTimeout`] if the load does not finish in time,
    /// [`SessionError::Cancelled`] on cancellation, or the page's own error.
    pub async fn navigate(&self, url: &str, cancel: &CancellationToken) -> Result<(), SessionError> {
        tracing::debug!(session = %self.id, url, "navigating");
        tokio::select! {
            () = cancel.cancelled() => Err(SessionError::Cancelled),
            result = tokio::time::timeout(self.page_load_timeout, self.page.navigate(url)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(SessionError::NavigationTimeout {
                        url: url.to_string(),
                        timeout: self.page_load_timeout,
                    }),
                }
            }
        }
    }

    /// Current document HTML.
    ///
    /// # Errors
    ///
    /// Propagates the page's error.
    pub async fn html(&self) -> Result<String, SessionError> {
        self.page.html().await
    }

    /// Current document URL.
    ///
    /// # Errors
    ///
    /// Propagates the page's error.
    pub async fn current_url(&self) -> Result<String, SessionError> {
        self.page.current_url().await
    }

    /// Return the first candidate with a non-empty match in the current document.
    ///
    /// # Errors
    ///
    /// [`SessionError::SelectorExhausted`] once every candidate has missed.
    pub async fn find(&self, candidates: &[&str]) -> Result<SelectorMatch, SessionError> {
        let html = self.page.html().await?;
        match_candidates(&html, candidates)
    }

    /// Poll the document until a candidate matches, `stop` reports an
    /// interstitial, or `timeout` elapses.
    ///
    /// `stop` inspects the raw HTML of a page where no candidate matched; when
    /// it returns `Some(reason)` polling ends with `Ok(Err(reason))`.
    ///
    /// # Errors
    ///
    /// [`SessionError::SelectorExhausted`] on timeout, or cancellation.
    pub async fn wait_for<F, R>(
        &self,
        candidates: &[&str],
        timeout: Duration,
        cancel: &CancellationToken,
        stop: F,
    ) -> Result<Result<SelectorMatch, R>, SessionError>
    where
        F: Fn(&str) -> Option<R> + Send + Sync,
        R: Send,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let html = self.page.html().await?;
            match match_candidates(&html, candidates) {
                Ok(found) => return Ok(Ok(found)),
                Err(exhausted) => {
                    if let Some(reason) = stop(&html) {
                        return Ok(Err(reason));
                    }
                    if tokio::time::Instant::now() >= deadline {
                        return Err(exhausted);
                    }
                }
            }
            self.behavior.pacing().poll.wait(cancel).await?;
        }
    }

    /// Click the first matching input, pause, then type `text` one character
    /// at a time with randomized keystroke delays.
    ///
    /// # Errors
    ///
    /// [`SessionError::SelectorExhausted`] if no input matches, cancellation,
    /// or the page's own error.
    pub async fn type_into(
        &self,
        candidates: &[&str],
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SelectorMatch, SessionError> {
        let input = self.find(candidates).await?;
        self.page.click(&input.candidate).await?;
        let pacing = self.behavior.pacing();
        pacing.focus.wait(cancel).await?;
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.page.type_str(ch.encode_utf8(&mut buf)).await?;
            pacing.keystroke.wait(cancel).await?;
        }
        Ok(input)
    }

    /// Submit the focused form.
    ///
    /// # Errors
    ///
    /// Propagates the page's error.
    pub async fn submit(&self) -> Result<(), SessionError> {
        self.page.press_enter().await
    }

    /// Run one round of simulated behavior, ending with the mandatory delay.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cancelled`] if cancelled during a pause.
    pub async fn simulate(&self, cancel: &CancellationToken) -> Result<(), SessionError> {
        self.behavior.perform(self.page.as_ref(), cancel).await?;
        Ok(())
    }

    /// Release the browser. Errors are logged, never returned.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            tracing::warn!(session = %self.id, error = %e, "session close failed");
        } else {
            tracing::debug!(session = %self.id, "session closed");
        }
    }
}

fn match_candidates(html: &str, candidates: &[&str]) -> Result<SelectorMatch, SessionError> {
    let doc = Html::parse_document(html);
    let resolved = selector::resolve(&doc, candidates)?;
    Ok(SelectorMatch {
        candidate: resolved.candidate,
        index: resolved.index,
        elements: resolved.elements.iter().map(|e| e.html()).collect(),
    })
}
