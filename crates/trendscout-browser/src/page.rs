use async_trait::async_trait;

use crate::error::SessionError;

/// The browser operations a session needs from an underlying page.
///
/// Implemented by the Chromium DevTools backend and by
/// [`crate::scripted::ScriptedPage`].
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Load `url` and resolve once the document has loaded.
    async fn navigate(&self, url: &str) -> Result<(), SessionError>;

    /// Serialized DOM of the current document.
    async fn html(&self) -> Result<String, SessionError>;

    async fn current_url(&self) -> Result<String, SessionError>;

    /// Click the first element matching `selector` and give it focus.
    async fn click(&self, selector: &str) -> Result<(), SessionError>;

    /// Send `text` as key presses to the focused element.
    async fn type_str(&self, text: &str) -> Result<(), SessionError>;

    async fn press_enter(&self) -> Result<(), SessionError>;

    async fn scroll_by(&self, delta_y: i64) -> Result<(), SessionError>;

    async fn move_pointer(&self, x: f64, y: f64) -> Result<(), SessionError>;

    /// Release the page and its browser process. Idempotent.
    async fn close(&self) -> Result<(), SessionError>;
}
