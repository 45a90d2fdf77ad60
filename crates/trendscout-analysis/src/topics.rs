//! Topic extraction, cross-platform validation and scoring.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trendscout_core::{ContentRecord, EngineConfig, Platform};

use crate::error::AnalysisError;
use crate::keywords::record_keywords;
use crate::scorer::mean_polarity;
use crate::taxonomy::{market_opportunity, Category};

/// Maximum samples carried on a topic.
pub const MAX_CONTENT_SAMPLES: usize = 5;
const MAX_RELATED_KEYWORDS: usize = 5;

const ENGAGEMENT_CAP: f64 = 1_000.0;
const PLATFORM_CAP: f64 = 4.0;
const RECORD_CAP: f64 = 20.0;
const GROWTH_MIN: f64 = -1.0;
const GROWTH_MAX: f64 = 5.0;

const WEIGHT_ENGAGEMENT: f64 = 0.30;
const WEIGHT_GROWTH: f64 = 0.25;
const WEIGHT_SENTIMENT: f64 = 0.15;
const WEIGHT_PLATFORMS: f64 = 0.20;
const WEIGHT_VOLUME: f64 = 0.10;

/// A keyword and every record that produced it.
#[derive(Debug, Clone)]
pub struct TopicCandidate<'a> {
    pub keyword: String,
    pub records: Vec<&'a ContentRecord>,
}

impl TopicCandidate<'_> {
    #[must_use]
    pub fn platforms(&self) -> BTreeSet<Platform> {
        self.records.iter().map(|r| r.platform()).collect()
    }

    /// Backed by at least `min_platforms` distinct platforms and `min_records` records.
    #[must_use]
    pub fn is_cross_platform(&self, min_platforms: usize, min_records: usize) -> bool {
        self.platforms().len() >= min_platforms && self.records.len() >= min_records
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_engagement(&self) -> u64 {
        let total: f64 = self.records.iter().map(|r| r.engagement()).sum();
        total.max(0.0).round() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthIndicators {
    pub growth_rate: f64,
    pub momentum: f64,
}

/// A validated, scored topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub platforms: Vec<Platform>,
    pub total_engagement: u64,
    pub growth_indicators: GrowthIndicators,
    pub sentiment_score: f64,
    /// Prediction score in `[0, 100]`.
    pub confidence_score: f64,
    pub category: Category,
    pub related_keywords: Vec<String>,
    pub market_opportunity: String,
    pub content_samples: Vec<ContentRecord>,
    pub scraped_at: DateTime<Utc>,
}

/// Thresholds for extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicSettings {
    pub min_platforms: usize,
    pub min_records: usize,
    /// Most frequent keywords considered before validation.
    pub max_candidates: usize,
    /// A keyword must come from at least this many records to be a candidate.
    pub min_keyword_records: usize,
    /// Times a phrase must occur within one record to count for it.
    pub min_phrase_frequency: usize,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            min_platforms: 2,
            min_records: 3,
            max_candidates: 50,
            min_keyword_records: 2,
            min_phrase_frequency: 1,
        }
    }
}

impl TopicSettings {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_platforms: config.min_topic_platforms,
            min_records: config.min_topic_records,
            max_candidates: config.max_topic_candidates,
            ..Self::default()
        }
    }
}

/// Drop records whose item confidence is below `min_confidence`.
#[must_use]
pub fn quality_filter(records: Vec<ContentRecord>, min_confidence: f64) -> Vec<ContentRecord> {
    let before = records.len();
    let kept: Vec<ContentRecord> = records
        .into_iter()
        .filter(|r| r.confidence_score >= min_confidence)
        .collect();
    tracing::debug!(
        before,
        kept = kept.len(),
        min_confidence,
        "quality filter applied"
    );
    kept
}

/// Turns a batch of records into ranked [`TrendingTopic`]s.
#[derive(Debug, Clone, Default)]
pub struct TopicExtractor {
    settings: TopicSettings,
}

impl TopicExtractor {
    #[must_use]
    pub fn new(settings: TopicSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &TopicSettings {
        &self.settings
    }

    /// [`Self::extract_at`] stamped with the current time.
    #[must_use]
    pub fn extract_trending_topics(&self, records: &[ContentRecord]) -> Vec<TrendingTopic> {
        self.extract_at(records, Utc::now())
    }

    /// Extract, validate and score topics; sorted by confidence descending,
    /// then topic text. Scoring is deterministic in `records` and `now`.
    #[must_use]
    pub fn extract_at(&self, records: &[ContentRecord], now: DateTime<Utc>) -> Vec<TrendingTopic> {
        let keyword_sets: Vec<BTreeSet<String>> = records
            .iter()
            .map(|r| record_keywords(&r.text(), self.settings.min_phrase_frequency))
            .collect();
        let candidates = self.candidates(records, &keyword_sets);
        let candidate_keywords: BTreeSet<&str> =
            candidates.iter().map(|c| c.keyword.as_str()).collect();

        let mut topics = Vec::new();
        for candidate in &candidates {
            if !candidate.is_cross_platform(self.settings.min_platforms, self.settings.min_records)
            {
                tracing::debug!(
                    keyword = %candidate.keyword,
                    platforms = candidate.platforms().len(),
                    records = candidate.records.len(),
                    "candidate not cross-platform validated"
                );
                continue;
            }
            let related =
                related_keywords(&candidate.keyword, &keyword_sets, &candidate_keywords);
            match score_candidate(candidate, related, now) {
                Ok(topic) => topics.push(topic),
                Err(e) => {
                    tracing::warn!(keyword = %candidate.keyword, error = %e, "topic dropped");
                }
            }
        }

        topics.sort_by(|a, b| {
            b.confidence_score
                .total_cmp(&a.confidence_score)
                .then_with(|| a.topic.cmp(&b.topic))
        });
        tracing::info!(
            records = records.len(),
            candidates = candidates.len(),
            topics = topics.len(),
            "topic extraction complete"
        );
        topics
    }

    /// The most frequent keywords (by number of records), ties alphabetical.
    fn candidates<'a>(
        &self,
        records: &'a [ContentRecord],
        keyword_sets: &[BTreeSet<String>],
    ) -> Vec<TopicCandidate<'a>> {
        let mut index: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, keywords) in keyword_sets.iter().enumerate() {
            for keyword in keywords {
                index.entry(keyword.as_str()).or_default().push(i);
            }
        }
        let mut ranked: Vec<(&str, Vec<usize>)> = index
            .into_iter()
            .filter(|(_, ids)| ids.len() >= self.settings.min_keyword_records)
            .collect();
        ranked.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.settings.max_candidates);

        ranked
            .into_iter()
            .map(|(keyword, ids)| TopicCandidate {
                keyword: keyword.to_string(),
                records: ids.into_iter().map(|i| &records[i]).collect(),
            })
            .collect()
    }
}

/// Late-half versus early-half mean engagement by capture time.
///
/// Returns `1.0` when there is no distinguishable older half.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn growth_rate(records: &[&ContentRecord]) -> f64 {
    let mut sorted: Vec<&ContentRecord> = records.to_vec();
    sorted.sort_by(|a, b| a.scraped_at.cmp(&b.scraped_at).then_with(|| a.url.cmp(&b.url)));
    let split = sorted.len() / 2;
    let (early, late) = sorted.split_at(split);
    let no_older_half = early.is_empty()
        || sorted
            .first()
            .zip(sorted.last())
            .is_some_and(|(first, last)| first.scraped_at == last.scraped_at);
    if no_older_half {
        return 1.0;
    }
    let mean = |items: &[&ContentRecord]| {
        items.iter().map(|r| r.engagement()).sum::<f64>() / items.len() as f64
    };
    let early_mean = mean(early);
    let late_mean = mean(late);
    round_to((late_mean - early_mean) / early_mean.max(1.0), 3).clamp(GROWTH_MIN, GROWTH_MAX)
}

/// `min(n / 10, 1)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn momentum(record_count: usize) -> f64 {
    round_to((record_count as f64 / 10.0).min(1.0), 3)
}

/// Weighted prediction score in `[0, 100]`, two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn prediction_score(
    total_engagement: u64,
    growth_rate: f64,
    sentiment: f64,
    platform_count: usize,
    record_count: usize,
) -> f64 {
    let engagement = (total_engagement as f64 / ENGAGEMENT_CAP).min(1.0);
    let growth = ((growth_rate.clamp(GROWTH_MIN, GROWTH_MAX) - GROWTH_MIN)
        / (GROWTH_MAX - GROWTH_MIN))
        .clamp(0.0, 1.0);
    let sentiment = ((sentiment.clamp(-1.0, 1.0) + 1.0) / 2.0).clamp(0.0, 1.0);
    let platforms = (platform_count as f64 / PLATFORM_CAP).min(1.0);
    let volume = (record_count as f64 / RECORD_CAP).min(1.0);

    let weighted = WEIGHT_ENGAGEMENT * engagement
        + WEIGHT_GROWTH * growth
        + WEIGHT_SENTIMENT * sentiment
        + WEIGHT_PLATFORMS * platforms
        + WEIGHT_VOLUME * volume;
    round_to(weighted * 100.0, 2).clamp(0.0, 100.0)
}

fn score_candidate(
    candidate: &TopicCandidate<'_>,
    related_keywords: Vec<String>,
    now: DateTime<Utc>,
) -> Result<TrendingTopic, AnalysisError> {
    let platforms: Vec<Platform> = candidate.platforms().into_iter().collect();
    let total_engagement = candidate.total_engagement();
    let growth = growth_rate(&candidate.records);
    let texts: Vec<String> = candidate.records.iter().map(|r| r.text()).collect();
    let sentiment = round_to(mean_polarity(texts.iter().map(String::as_str)), 3);
    let confidence = prediction_score(
        total_engagement,
        growth,
        sentiment,
        platforms.len(),
        candidate.records.len(),
    );
    if ![growth, sentiment, confidence].iter().all(|v| v.is_finite()) {
        return Err(AnalysisError::NonFiniteScore {
            topic: candidate.keyword.clone(),
        });
    }

    let category = Category::classify(&candidate.keyword);
    Ok(TrendingTopic {
        topic: candidate.keyword.clone(),
        market_opportunity: market_opportunity(
            category,
            total_engagement,
            platforms.len(),
            growth,
        ),
        platforms,
        total_engagement,
        growth_indicators: GrowthIndicators {
            growth_rate: growth,
            momentum: momentum(candidate.records.len()),
        },
        sentiment_score: sentiment,
        confidence_score: confidence,
        category,
        related_keywords,
        content_samples: samples(&candidate.records),
        scraped_at: now,
    })
}

/// Highest-engagement records first; ties by URL.
fn samples(records: &[&ContentRecord]) -> Vec<ContentRecord> {
    let mut sorted: Vec<&ContentRecord> = records.to_vec();
    sorted.sort_by(|a, b| {
        b.engagement()
            .total_cmp(&a.engagement())
            .then_with(|| a.url.cmp(&b.url))
    });
    sorted
        .into_iter()
        .take(MAX_CONTENT_SAMPLES)
        .cloned()
        .collect()
}

/// Other candidate keywords that co-occur with `keyword`, by co-occurrence
/// count descending then alphabetically.
fn related_keywords(
    keyword: &str,
    keyword_sets: &[BTreeSet<String>],
    candidates: &BTreeSet<&str>,
) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for keywords in keyword_sets.iter().filter(|k| k.contains(keyword)) {
        for other in keywords {
            if other != keyword && candidates.contains(other.as_str()) {
                *counts.entry(other.as_str()).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(MAX_RELATED_KEYWORDS)
        .map(|(k, _)| k.to_string())
        .collect()
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
#[path = "topics_test.rs"]
mod tests;
