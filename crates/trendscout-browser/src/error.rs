use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The browser process or its first page could not be brought up.
    #[error("browser init failed: {0}")]
    BrowserInit(String),

    #[error("navigation to {url} did not finish within {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    /// Every selector candidate matched nothing.
    #[error("no selector matched; tried: {}", tried.join(", "))]
    SelectorExhausted { tried: Vec<String> },

    #[error("proxy failure: {0}")]
    Proxy(String),

    #[error("browser protocol error: {0}")]
    Cdp(String),

    #[error("cancelled")]
    Cancelled,
}

impl SessionError {
    /// Classify a raw browser/protocol error message.
    ///
    /// Chromium reports egress problems as `net::ERR_PROXY_*`, `ERR_TUNNEL_*`
    /// or `ERR_SOCKS_*`; those become [`SessionError::Proxy`].
    #[must_use]
    pub fn from_cdp_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let upper = message.to_ascii_uppercase();
        if upper.contains("ERR_PROXY")
            || upper.contains("ERR_TUNNEL")
            || upper.contains("ERR_SOCKS")
        {
            SessionError::Proxy(message)
        } else {
            SessionError::Cdp(message)
        }
    }

    /// Whether this failure points at the egress identity rather than the site.
    #[must_use]
    pub fn is_identity_failure(&self) -> bool {
        matches!(self, SessionError::Proxy(_) | SessionError::BrowserInit(_))
    }
}
