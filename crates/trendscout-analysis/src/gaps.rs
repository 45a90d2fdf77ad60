//! Content-gap detection over ranked topics.

use serde::{Deserialize, Serialize};
use trendscout_core::Platform;

use crate::topics::{round_to, TrendingTopic};

/// Multiplier from topic confidence to gap opportunity.
const COVERAGE_WEIGHT: f64 = 0.8;
const CONTENT_TYPE_OPPORTUNITY: f64 = 0.7;
/// Video samples below this share of text samples signal a format gap.
const VIDEO_SHARE_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    PlatformCoverage,
    ContentType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGap {
    pub gap_type: GapType,
    pub description: String,
    /// In `[0, 1]`.
    pub opportunity_score: f64,
    pub target_platforms: Vec<Platform>,
    pub suggested_content_types: Vec<String>,
}

/// Formats that fit a platform.
#[must_use]
pub fn suggested_content_types(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::YouTube => &["tutorial_video", "review_video", "case_study"],
        Platform::Reddit => &["discussion_post", "ama", "guide"],
        Platform::Twitter => &["thread", "quick_tip", "news_update"],
        Platform::Google => &["blog_post", "how_to_guide", "resource_list"],
    }
}

/// One coverage gap per platform missing from each of the first `top_n`
/// topics, then a single format gap when video samples are scarce.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn identify_content_gaps(topics: &[TrendingTopic], top_n: usize) -> Vec<ContentGap> {
    let mut gaps = Vec::new();

    for topic in topics.iter().take(top_n) {
        let opportunity =
            round_to(topic.confidence_score / 100.0 * COVERAGE_WEIGHT, 3).clamp(0.0, 1.0);
        for platform in Platform::ALL
            .iter()
            .copied()
            .filter(|p| !topic.platforms.contains(p))
        {
            gaps.push(ContentGap {
                gap_type: GapType::PlatformCoverage,
                description: format!("'{}' has no coverage on {platform}", topic.topic),
                opportunity_score: opportunity,
                target_platforms: vec![platform],
                suggested_content_types: suggested_content_types(platform)
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }
    }

    let (video, text) = topics
        .iter()
        .flat_map(|t| &t.content_samples)
        .fold((0usize, 0usize), |(video, text), record| {
            if record.platform().is_video() {
                (video + 1, text)
            } else {
                (video, text + 1)
            }
        });
    if (video as f64) < (text as f64) * VIDEO_SHARE_THRESHOLD {
        gaps.push(ContentGap {
            gap_type: GapType::ContentType,
            description: format!(
                "Video is under-represented ({video} video vs {text} text samples)"
            ),
            opportunity_score: CONTENT_TYPE_OPPORTUNITY,
            target_platforms: vec![Platform::YouTube],
            suggested_content_types: ["tutorial_video", "case_study_video", "review_video"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        });
    }

    tracing::debug!(topics = topics.len(), gaps = gaps.len(), "content gaps identified");
    gaps
}
