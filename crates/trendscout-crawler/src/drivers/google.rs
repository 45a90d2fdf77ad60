use chrono::{DateTime, Utc};
use scraper::Html;
use trendscout_browser::selector::{first_within, resolve, text_of};
use trendscout_core::{ContentRecord, Platform, PlatformMetrics, TimeRange};

use super::{absolute_url, keyword_bonus, since_date};
use crate::driver::{PlatformDriver, SearchPass};

const LANDING_URL: &str = "https://www.google.com/";
const SEARCH_INPUTS: &[&str] = &["textarea[name=\"q\"]", "input[name=\"q\"]", "#APjFqb"];
const RESULT_MARKERS: &[&str] = &["div.g", ".yuRUbf", "div[data-hveid]", "[data-ved]"];
const EMPTY_MARKERS: &[&str] = &["#topstuff .card-section", "div.mnr-c"];
const SNIPPETS: &[&str] = &[".VwiC3b", "[data-sncf]", "div[style*=\"-webkit-line-clamp\"]", "span.st"];
const QUALIFIERS: &str = "(\"side hustle\" OR \"passive income\" OR monetization OR tutorial)";
const HOW_TO_KEYWORDS: &[&str] = &["tutorial", "guide", "how to", "step"];

/// Web search results.
#[derive(Debug, Clone)]
pub struct GoogleDriver {
    limit: usize,
}

impl GoogleDriver {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Base 0.7, +0.15 for how-to wording, +0.1 for a substantial snippet.
    #[must_use]
    pub fn confidence(title: &str, snippet: &str) -> f64 {
        let mut score = 0.7;
        score += keyword_bonus(title, HOW_TO_KEYWORDS, 0.15);
        if snippet.chars().count() > 100 {
            score += 0.1;
        }
        score.clamp(0.0, 1.0)
    }
}

/// Unwrap Google's `/url?q=<target>` redirect links.
fn unwrap_redirect(url: &str) -> String {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return url.to_string();
    };
    let is_redirect = parsed
        .host_str()
        .is_some_and(|h| h.ends_with("google.com"))
        && parsed.path() == "/url";
    if is_redirect {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "q" || k == "url") {
            return target.into_owned();
        }
    }
    url.to_string()
}

fn domain_of(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

impl PlatformDriver for GoogleDriver {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn passes(&self, query: &str, time_range: TimeRange, now: DateTime<Utc>) -> Vec<SearchPass> {
        let typed_query = format!(
            "{} {QUALIFIERS} after:{}",
            query.trim(),
            since_date(now, time_range.days())
        );
        vec![SearchPass {
            label: "web".to_string(),
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

    fn extract(&self, html: &str, pass: &SearchPass, now: DateTime<Utc>) -> Vec<ContentRecord> {
        let doc = Html::parse_document(html);
        let Ok(results) = resolve(&doc, RESULT_MARKERS) else {
            return Vec::new();
        };

        let mut items: Vec<(String, String, String)> = Vec::new();
        for element in results.elements {
            if items.len() >= pass.limit {
                break;
            }
            let Some(title) = first_within(element, &["h3"]).map(text_of) else {
                continue;
            };
            let Some(href) = first_within(element, &["a[href]"]).and_then(|a| a.value().attr("href"))
            else {
                continue;
            };
            let Some(url) = absolute_url(LANDING_URL, href).map(|u| unwrap_redirect(&u)) else {
                continue;
            };
            if title.is_empty() || items.iter().any(|(_, u, _)| *u == url) {
                continue;
            }
            let snippet = first_within(element, SNIPPETS).map(text_of).unwrap_or_default();
            items.push((title, url, snippet));
        }

        let total = items.len() as u64;
        items
            .into_iter()
            .zip(0u64..)
            .map(|((title, url, snippet), i)| ContentRecord {
                confidence_score: Self::confidence(&title, &snippet),
                author: domain_of(&url),
                metrics: PlatformMetrics::Google {
                    ranking: total - i,
                },
                title,
                content: snippet,
                url,
                scraped_at: now,
            })
            .collect()
    }
}
