use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use trendscout_browser::selector::{first_within, resolve, text_of};
use trendscout_core::{ContentRecord, Platform, PlatformMetrics, TimeRange};

use super::{absolute_url, keyword_bonus, parse_count};
use crate::driver::{PlatformDriver, SearchPass};

const BASE_URL: &str = "https://old.reddit.com/";
const SUBREDDITS: &[&str] = &["entrepreneur", "sidehustle", "passive_income"];
const SEARCH_INPUTS: &[&str] = &["input[name=\"q\"]", "#search input[type=\"text\"]"];
const RESULT_MARKERS: &[&str] = &[
    ".search-result-link",
    ".thing",
    "[data-testid=\"post-container\"]",
];
const EMPTY_MARKERS: &[&str] = &["#noresults", ".search-result-listing .error"];
const BLOCK_MARKERS: &[&str] = &["whoa there, pardner", "blocked due to a network policy"];
const TITLES: &[&str] = &["a.search-title", ".title a", "a.title", "h3"];
const AUTHORS: &[&str] = &[".author", "a[href*=\"/user/\"]"];
const SCORES: &[&str] = &[".search-score", ".score.unvoted", ".score"];
const COMMENTS: &[&str] = &[".search-comments", "a.comments"];
const BODIES: &[&str] = &[".search-result-body", ".md", ".expando"];
const EXPERIENCE_KEYWORDS: &[&str] = &["guide", "tips", "experience", "success"];

/// Sub-community search across the side-income subreddits, one pass each.
#[derive(Debug, Clone)]
pub struct RedditDriver {
    limit: usize,
}

impl RedditDriver {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Base 0.65, +0.15 for experience wording, plus an engagement bonus.
    #[must_use]
    pub fn confidence(title: &str, score: u64, comments: u64) -> f64 {
        let mut confidence = 0.65;
        confidence += keyword_bonus(title, EXPERIENCE_KEYWORDS, 0.15);
        let engagement = score.saturating_add(comments.saturating_mul(2));
        if engagement > 100 {
            confidence += 0.1;
        } else if engagement > 20 {
            confidence += 0.05;
        }
        confidence.clamp(0.0, 1.0)
    }

    fn sort_window(time_range: TimeRange) -> &'static str {
        match time_range {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        }
    }
}

/// Prefer the machine-readable attribute, fall back to the visible label.
fn count_of(element: ElementRef<'_>, attr: &str, fallbacks: &[&str]) -> u64 {
    element
        .value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| first_within(element, fallbacks).and_then(|e| parse_count(&text_of(e))))
        .unwrap_or(0)
}

impl PlatformDriver for RedditDriver {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn passes(&self, query: &str, time_range: TimeRange, _now: DateTime<Utc>) -> Vec<SearchPass> {
        let per_pass = self.limit.div_ceil(SUBREDDITS.len());
        let window = Self::sort_window(time_range);
        let typed_query = format!("{} (side hustle OR passive income OR guide)", query.trim());
        SUBREDDITS
            .iter()
            .map(|sub| SearchPass {
                label: format!("r/{sub}"),
                landing_url: format!(
                    "{BASE_URL}r/{sub}/search?restrict_sr=on&sort=relevance&t={window}"
                ),
                typed_query: typed_query.clone(),
                limit: per_pass,
            })
            .collect()
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
        let subreddit = pass.label.trim_start_matches("r/");

        let mut records: Vec<ContentRecord> = Vec::new();
        for (position, element) in (1u64..).zip(results.elements) {
            if records.len() >= pass.limit {
                break;
            }
            let Some(link) = first_within(element, TITLES) else {
                continue;
            };
            let title = text_of(link);
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| absolute_url(BASE_URL, href))
            else {
                continue;
            };
            if title.is_empty() || records.iter().any(|r| r.url == url) {
                continue;
            }
            let author = first_within(element, AUTHORS)
                .map(text_of)
                .unwrap_or_default();
            let score = count_of(element, "data-score", SCORES);
            let comments = count_of(element, "data-comments-count", COMMENTS);
            let content = match first_within(element, BODIES).map(text_of) {
                Some(body) if !body.is_empty() => format!("Discussion from r/{subreddit}: {body}"),
                _ => format!("Discussion from r/{subreddit}"),
            };

            records.push(ContentRecord {
                confidence_score: Self::confidence(&title, score, comments),
                title,
                content,
                url,
                author,
                metrics: PlatformMetrics::Reddit {
                    score,
                    comments,
                    position,
                },
                scraped_at: now,
            });
        }
        records
    }
}
