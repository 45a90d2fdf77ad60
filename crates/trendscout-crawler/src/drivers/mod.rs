//! Per-platform drivers.

mod google;
mod reddit;
mod twitter;
mod youtube;

pub use google::GoogleDriver;
pub use reddit::RedditDriver;
pub use twitter::TwitterDriver;
pub use youtube::YouTubeDriver;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use trendscout_core::{EngineConfig, Platform};

use crate::driver::PlatformDriver;

/// Build the driver for `platform` using the configured result cap.
#[must_use]
pub fn driver_for(platform: Platform, config: &EngineConfig) -> Box<dyn PlatformDriver> {
    let limit = config.result_limits.for_platform(platform);
    match platform {
        Platform::Google => Box::new(GoogleDriver::new(limit)),
        Platform::YouTube => Box::new(YouTubeDriver::new(limit)),
        Platform::Reddit => Box::new(RedditDriver::new(limit)),
        Platform::Twitter => Box::new(TwitterDriver::new(limit)),
    }
}

/// Drivers for every configured platform, in configured order.
#[must_use]
pub fn configured_drivers(config: &EngineConfig) -> Vec<Box<dyn PlatformDriver>> {
    config
        .platforms
        .iter()
        .map(|p| driver_for(*p, config))
        .collect()
}

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([kmb])?\b").expect("valid count regex")
});

/// Parse abbreviated counts such as `1.2K views`, `3M`, or `12,345 points`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let caps = COUNT_RE.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(ref s) if s == "k" => 1_000.0,
        Some(ref s) if s == "m" => 1_000_000.0,
        Some(ref s) if s == "b" => 1_000_000_000.0,
        _ => 1.0,
    };
    Some((number * multiplier).round() as u64)
}

/// `bonus` if `text` contains any of `keywords` (case-insensitive), else 0.
#[must_use]
pub(crate) fn keyword_bonus(text: &str, keywords: &[&str], bonus: f64) -> f64 {
    let lower = text.to_lowercase();
    if keywords.iter().any(|k| lower.contains(k)) {
        bonus
    } else {
        0.0
    }
}

/// Resolve `href` against `base`; only http(s) results are kept.
#[must_use]
pub(crate) fn absolute_url(base: &str, href: &str) -> Option<String> {
    let base = reqwest::Url::parse(base).ok()?;
    let url = base.join(href.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// `YYYY-MM-DD` of `now` minus `days`.
#[must_use]
pub(crate) fn since_date(now: DateTime<Utc>, days: i64) -> String {
    (now - chrono::Duration::days(days))
        .format("%Y-%m-%d")
        .to_string()
}

/// Truncate to at most `max` characters on a char boundary.
#[must_use]
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
