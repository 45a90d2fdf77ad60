//! Interstitial detection.
//!
//! Only consulted after the expected selectors have missed, so ordinary pages
//! that merely mention "captcha" in a script are not misclassified.

const BODY_MARKERS: &[&str] = &[
    "g-recaptcha",
    "h-captcha",
    "captcha-form",
    "id=\"captcha\"",
    "unusual traffic from your computer",
    "verify you are human",
    "are you a robot",
    "challenge-form",
    "cf-challenge",
    "cf-browser-verification",
    "press &amp; hold",
    "our systems have detected unusual traffic",
    "you've been blocked",
    "you have been blocked",
    "too many requests",
];

const URL_MARKERS: &[&str] = &["/sorry/", "/captcha", "consent.youtube.com", "/account/login"];

/// Returns the matched marker when `html` or `url` looks like a block,
/// verification, or forced-login page.
#[must_use]
pub fn detect_block(html: &str, url: &str, extra_markers: &[&str]) -> Option<String> {
    let url_lower = url.to_ascii_lowercase();
    if let Some(marker) = URL_MARKERS.iter().find(|m| url_lower.contains(*m)) {
        return Some(format!("url matched {marker}"));
    }
    let body = html.to_ascii_lowercase();
    BODY_MARKERS
        .iter()
        .chain(extra_markers.iter())
        .find(|m| body.contains(&m.to_ascii_lowercase()))
        .map(|m| format!("page matched \"{m}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_sorry_page_is_blocked() {
        let reason = detect_block("<html></html>", "https://www.google.com/sorry/index?continue=x", &[]);
        assert_eq!(reason.as_deref(), Some("url matched /sorry/"));
    }

    #[test]
    fn recaptcha_body_is_blocked() {
        let html = r#"<div class="g-recaptcha" data-sitekey="k"></div>"#;
        assert!(detect_block(html, "https://example.com/", &[]).is_some());
    }

    #[test]
    fn ordinary_results_are_not_blocked() {
        let html = "<div class=\"g\"><h3>How to start a side hustle</h3></div>";
        assert!(detect_block(html, "https://www.google.com/search?q=x", &[]).is_none());
    }

    #[test]
    fn driver_specific_markers_apply() {
        let html = "<a data-testid=\"loginButton\">Log in</a>";
        assert!(detect_block(html, "https://x.com/search", &[]).is_none());
        assert!(detect_block(html, "https://x.com/search", &["data-testid=\"loginButton\""]).is_some());
    }
}
