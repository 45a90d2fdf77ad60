use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use trendscout_browser::selector::{first_within, resolve, text_of};
use trendscout_core::{ContentRecord, Platform, PlatformMetrics, TimeRange};

use super::{absolute_url, keyword_bonus, parse_count, since_date, truncate_chars};
use crate::driver::{PlatformDriver, SearchPass};

const BASE_URL: &str = "https://x.com/";
const LANDING_URL: &str = "https://x.com/explore";
const SEARCH_INPUTS: &[&str] = &[
    "input[data-testid=\"SearchBox_Search_Input\"]",
    "input[aria-label=\"Search query\"]",
    "input[name=\"q\"]",
];
const RESULT_MARKERS: &[&str] = &["article[data-testid=\"tweet\"]", "article"];
const EMPTY_MARKERS: &[&str] = &["[data-testid=\"emptyState\"]"];
const BLOCK_MARKERS: &[&str] = &["Sign in to X", "data-testid=\"loginButton\""];
const TEXTS: &[&str] = &["[data-testid=\"tweetText\"]", "div[lang]"];
const AUTHORS: &[&str] = &["[data-testid=\"User-Name\"] a[href^=\"/\"]", "a[role=\"link\"][href^=\"/\"]"];
const STATUS_LINKS: &[&str] = &["a[href*=\"/status/\"]"];
const TITLE_CHARS: usize = 100;
const THREAD_KEYWORDS: &[&str] = &["thread", "guide", "tips", "how to"];

/// Post search. Without a logged-in identity this is usually walled; the wall
/// is reported as a block.
#[derive(Debug, Clone)]
pub struct TwitterDriver {
    limit: usize,
}

impl TwitterDriver {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Base 0.6, +0.15 for thread/tip wording, +0.15 above 100 engagement or
    /// +0.1 above 20.
    #[must_use]
    pub fn confidence(text: &str, engagement: u64) -> f64 {
        let mut score = 0.6;
        score += keyword_bonus(text, THREAD_KEYWORDS, 0.15);
        if engagement > 100 {
            score += 0.15;
        } else if engagement > 20 {
            score += 0.1;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Count from a `[data-testid=...]` action button; `aria-label` carries the
/// unabbreviated number when present.
fn action_count(element: ElementRef<'_>, testid: &str) -> u64 {
    let selector = format!("[data-testid=\"{testid}\"]");
    let Some(button) = first_within(element, &[selector.as_str()]) else {
        return 0;
    };
    button
        .value()
        .attr("aria-label")
        .and_then(parse_count)
        .or_else(|| parse_count(&text_of(button)))
        .unwrap_or(0)
}

/// `@handle` from a `/handle/status/123` permalink.
fn handle_from_status(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let handle = parsed.path_segments()?.next()?;
    (!handle.is_empty()).then(|| format!("@{handle}"))
}

impl PlatformDriver for TwitterDriver {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn passes(&self, query: &str, time_range: TimeRange, now: DateTime<Utc>) -> Vec<SearchPass> {
        let typed_query = format!(
            "{} (side hustle OR passive income OR tips) since:{}",
            query.trim(),
            since_date(now, time_range.days())
        );
        vec![SearchPass {
            label: "posts".to_string(),
            landing_url: LANDING_URL.to_string(),
            typed_query,
            limit: self.limit,
        }]
    }

    fn search_inputs(&self) -> &'static [&'static str] {
        SEARCH_INPUTS
    }

    fn result_markers(&self) -> &'static [&'static str] {
        RESULT_MARKERS
    }

    fn empty_markers(&self) -> &'static [&'static str] {
        EMPTY_MARKERS
    }

    fn block_markers(&self) -> &'static [&'static str] {
        BLOCK_MARKERS
    }

    fn extract(&self, html: &str, pass: &SearchPass, now: DateTime<Utc>) -> Vec<ContentRecord> {
        let doc = Html::parse_document(html);
        let Ok(results) = resolve(&doc, RESULT_MARKERS) else {
            return Vec::new();
        };

        let mut records: Vec<ContentRecord> = Vec::new();
        for element in results.elements {
            if records.len() >= pass.limit {
                break;
            }
            let Some(text) = first_within(element, TEXTS)
                .map(text_of)
                .filter(|t| !t.is_empty())
            else {
                continue;
            };
            let Some(url) = first_within(element, STATUS_LINKS)
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| absolute_url(BASE_URL, href))
            else {
                continue;
            };
            if records.iter().any(|r| r.url == url) {
                continue;
            }
            let author = handle_from_status(&url)
                .or_else(|| first_within(element, AUTHORS).map(text_of))
                .unwrap_or_default();
            let retweets = action_count(element, "retweet");
            let likes = action_count(element, "like");
            let replies = action_count(element, "reply");
            let metrics = PlatformMetrics::Twitter {
                retweets,
                likes,
                replies,
            };
            let engagement = retweets
                .saturating_add(likes)
                .saturating_add(replies);

            records.push(ContentRecord {
                confidence_score: Self::confidence(&text, engagement),
                title: truncate_chars(&text, TITLE_CHARS),
                content: text,
                url,
                author,
                metrics,
                scraped_at: now,
            });
        }
        records
    }
}
