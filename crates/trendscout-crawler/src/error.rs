use std::time::Duration;

use thiserror::Error;
use trendscout_browser::SessionError;
use trendscout_core::Platform;

/// Why one platform's turn produced no records.
///
/// Always caught at the orchestrator boundary; never escapes a crawl.
#[derive(Debug, Error)]
pub enum PlatformSearchError {
    #[error("{platform}: browser init failed: {reason}")]
    BrowserInit { platform: Platform, reason: String },

    #[error("{platform}: navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout {
        platform: Platform,
        url: String,
        timeout: Duration,
    },

    #[error("{platform}: blocked or challenged ({reason})")]
    BlockedOrChallenged { platform: Platform, reason: String },

    #[error("{platform}: no selector matched (tried {})", tried.join(", "))]
    SelectorExhausted {
        platform: Platform,
        tried: Vec<String>,
    },

    #[error("{platform}: proxy failure: {reason}")]
    ProxyFailure { platform: Platform, reason: String },

    #[error("{platform}: exceeded driver budget of {budget:?}")]
    DriverBudgetExceeded { platform: Platform, budget: Duration },

    #[error("{platform}: browser error: {reason}")]
    Browser { platform: Platform, reason: String },

    #[error("cancelled")]
    Cancelled,
}

impl PlatformSearchError {
    /// Attach a platform to a session-layer error.
    #[must_use]
    pub fn from_session(platform: Platform, err: SessionError) -> Self {
        match err {
            SessionError::BrowserInit(reason) => Self::BrowserInit { platform, reason },
            SessionError::NavigationTimeout { url, timeout } => Self::NavigationTimeout {
                platform,
                url,
                timeout,
            },
            SessionError::SelectorExhausted { tried } => Self::SelectorExhausted { platform, tried },
            SessionError::Proxy(reason) => Self::ProxyFailure { platform, reason },
            SessionError::Cdp(reason) => Self::Browser { platform, reason },
            SessionError::Cancelled => Self::Cancelled,
        }
    }

    /// Whether the egress identity should be penalized for this failure.
    #[must_use]
    pub fn burns_identity(&self) -> bool {
        matches!(
            self,
            Self::BrowserInit { .. } | Self::ProxyFailure { .. } | Self::BlockedOrChallenged { .. }
        )
    }

    /// Whether retrying with a different identity could help.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::BrowserInit { .. } | Self::ProxyFailure { .. })
    }
}

/// The only errors a crawl surfaces to its caller.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Every configured platform failed or returned nothing.
    #[error("no platform returned results for '{query}'")]
    EmptyBatch { query: String },

    #[error("crawl cancelled")]
    Cancelled,
}
