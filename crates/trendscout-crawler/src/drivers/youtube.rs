use chrono::{DateTime, Utc};
use scraper::Html;
use trendscout_browser::selector::{first_within, resolve, text_of};
use trendscout_core::{ContentRecord, Platform, PlatformMetrics, TimeRange};

use super::{absolute_url, keyword_bonus, parse_count};
use crate::driver::{PlatformDriver, SearchPass};

const LANDING_URL: &str = "https://www.youtube.com/";
const SEARCH_INPUTS: &[&str] = &[
    "input#search",
    "input[name=\"search_query\"]",
    "ytd-searchbox input",
];
const RESULT_MARKERS: &[&str] = &["ytd-video-renderer", "ytd-rich-item-renderer"];
const EMPTY_MARKERS: &[&str] = &["ytd-background-promo-renderer"];
const BLOCK_MARKERS: &[&str] = &["consent.youtube.com"];
const TITLES: &[&str] = &["a#video-title", "#video-title"];
const CHANNELS: &[&str] = &["#channel-info #text a", "ytd-channel-name a", "#channel-name a"];
const VIEWS: &[&str] = &["#metadata-line span", ".inline-metadata-item"];
const DESCRIPTIONS: &[&str] = &["#description-text", ".metadata-snippet-text"];
const QUALIFIERS: &str = "side hustle passive income tutorial";
const HOW_TO_KEYWORDS: &[&str] = &["tutorial", "guide", "how to", "review"];

/// Video search results. Content is the listing's description snippet;
/// transcripts are attached later.
#[derive(Debug, Clone)]
pub struct YouTubeDriver {
    limit: usize,
}

impl YouTubeDriver {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Base 0.6, +0.2 for how-to wording, +0.15 above 10k views or +0.1 above 1k.
    #[must_use]
    pub fn confidence(title: &str, views: u64) -> f64 {
        let mut score = 0.6;
        score += keyword_bonus(title, HOW_TO_KEYWORDS, 0.2);
        if views > 10_000 {
            score += 0.15;
        } else if views > 1_000 {
            score += 0.1;
        }
        score.clamp(0.0, 1.0)
    }
}

impl PlatformDriver for YouTubeDriver {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn passes(&self, query: &str, time_range: TimeRange, _now: DateTime<Utc>) -> Vec<SearchPass> {
        tracing::debug!(%time_range, "video search has no date filter; time range ignored");
        vec![SearchPass {
            label: "videos".to_string(),
            landing_url: LANDING_URL.to_string(),
            typed_query: format!("{} {QUALIFIERS}", query.trim()),
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
            let Some(link) = first_within(element, TITLES) else {
                continue;
            };
            let title = link
                .value()
                .attr("title")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map_or_else(|| text_of(link), ToString::to_string);
            let Some(url) = link
                .value()
                .attr("href")
                .and_then(|href| absolute_url(LANDING_URL, href))
            else {
                continue;
            };
            if title.is_empty() || records.iter().any(|r| r.url == url) {
                continue;
            }
            let author = first_within(element, CHANNELS)
                .map(text_of)
                .unwrap_or_default();
            let views = first_within(element, VIEWS)
                .map(text_of)
                .and_then(|t| parse_count(&t))
                .unwrap_or(0);
            let description = first_within(element, DESCRIPTIONS)
                .map(text_of)
                .unwrap_or_default();

            records.push(ContentRecord {
                confidence_score: Self::confidence(&title, views),
                title,
                content: description,
                url,
                author,
                metrics: PlatformMetrics::YouTube { views },
                scraped_at: now,
            });
        }
        records
    }
}
