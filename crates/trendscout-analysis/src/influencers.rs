//! Author-level aggregation over the sample records of ranked topics.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use trendscout_core::{ContentRecord, Platform};

use crate::topics::{round_to, TrendingTopic};

pub const DEFAULT_INFLUENCER_LIMIT: usize = 10;
const MIN_AUTHOR_RECORDS: usize = 2;
const MAX_THEMES: usize = 5;
const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingFrequency {
    High,
    Medium,
    Low,
}

impl PostingFrequency {
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        match count {
            10.. => PostingFrequency::High,
            5..=9 => PostingFrequency::Medium,
            _ => PostingFrequency::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfluencerProfile {
    pub name: String,
    /// Platform carrying most of this author's records.
    pub platform: Platform,
    pub platforms: Vec<Platform>,
    pub follower_estimate: u64,
    /// `min(mean engagement / 1000, 1)`.
    pub engagement_rate: f64,
    pub total_engagement: u64,
    pub content_count: usize,
    pub content_themes: Vec<String>,
    pub posting_frequency: PostingFrequency,
    pub collaboration_potential: f64,
}

#[derive(Default)]
struct AuthorTally<'a> {
    per_platform: BTreeMap<Platform, usize>,
    total_engagement: f64,
    count: usize,
    themes: Vec<&'a str>,
}

/// Step function over mean engagement.
#[must_use]
pub fn follower_estimate(mean_engagement: f64) -> u64 {
    if mean_engagement < 10.0 {
        1_000
    } else if mean_engagement < 100.0 {
        10_000
    } else if mean_engagement < 1_000.0 {
        50_000
    } else {
        100_000
    }
}

/// `0.5` base plus bonuses for platform spread, reach and volume, capped at 1.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn collaboration_potential(platform_count: usize, total_engagement: f64, count: usize) -> f64 {
    let score = 0.5
        + 0.1 * platform_count as f64
        + (total_engagement / 1_000.0).min(0.3)
        + (count as f64 * 0.05).min(0.2);
    round_to(score.min(1.0), 3)
}

/// Profiles for authors appearing at least twice across all topic samples,
/// best collaboration candidates first.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn analyze_influencers(topics: &[TrendingTopic], limit: usize) -> Vec<InfluencerProfile> {
    let mut tallies: BTreeMap<&str, AuthorTally<'_>> = BTreeMap::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for topic in topics {
        for record in &topic.content_samples {
            let author = record.author.trim();
            if author.is_empty() || author == UNKNOWN_AUTHOR {
                continue;
            }
            let tally = tallies.entry(author).or_default();
            if !tally.themes.contains(&topic.topic.as_str()) {
                tally.themes.push(topic.topic.as_str());
            }
            // A record sampled under several topics counts once.
            if seen.insert(record.url.as_str()) {
                tally_record(tally, record);
            }
        }
    }

    let mut profiles: Vec<InfluencerProfile> = tallies
        .into_iter()
        .filter(|(_, tally)| tally.count >= MIN_AUTHOR_RECORDS)
        .filter_map(|(name, tally)| {
            let platform = tally
                .per_platform
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(p, _)| *p)?;
            let mean = tally.total_engagement / tally.count as f64;
            Some(InfluencerProfile {
                name: name.to_string(),
                platform,
                platforms: tally.per_platform.keys().copied().collect(),
                follower_estimate: follower_estimate(mean),
                engagement_rate: round_to((mean / 1_000.0).min(1.0), 3),
                total_engagement: tally.total_engagement.round() as u64,
                content_count: tally.count,
                content_themes: tally
                    .themes
                    .iter()
                    .take(MAX_THEMES)
                    .map(ToString::to_string)
                    .collect(),
                posting_frequency: PostingFrequency::from_count(tally.count),
                collaboration_potential: collaboration_potential(
                    tally.per_platform.len(),
                    tally.total_engagement,
                    tally.count,
                ),
            })
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.collaboration_potential
            .total_cmp(&a.collaboration_potential)
            .then_with(|| a.name.cmp(&b.name))
    });
    profiles.truncate(limit);

    tracing::debug!(count = profiles.len(), "influencer profiles built");
    profiles
}

fn tally_record(tally: &mut AuthorTally<'_>, record: &ContentRecord) {
    *tally.per_platform.entry(record.platform()).or_default() += 1;
    tally.total_engagement += record.engagement();
    tally.count += 1;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
