//! Human-readable and JSON rendering of analysis results.

use std::fmt::Write as _;

use serde::Serialize;
use trendscout_analysis::{ContentGap, InfluencerProfile, TrendingTopic};

/// Pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn format_topics(topics: &[TrendingTopic]) -> String {
    if topics.is_empty() {
        return "no cross-platform topics found\n".to_string();
    }
    let mut out = String::new();
    for (rank, topic) in topics.iter().enumerate() {
        let platforms: Vec<String> = topic.platforms.iter().map(ToString::to_string).collect();
        let _ = writeln!(
            out,
            "{:>2}. {} [{}] confidence {:.2}",
            rank + 1,
            topic.topic,
            topic.category,
            topic.confidence_score
        );
        let _ = writeln!(
            out,
            "    platforms: {}  engagement: {}  growth: {:+.3}  momentum: {:.3}  sentiment: {:+.3}",
            platforms.join(", "),
            topic.total_engagement,
            topic.growth_indicators.growth_rate,
            topic.growth_indicators.momentum,
            topic.sentiment_score
        );
        if !topic.related_keywords.is_empty() {
            let _ = writeln!(out, "    related: {}", topic.related_keywords.join(", "));
        }
        let _ = writeln!(out, "    {}", topic.market_opportunity);
    }
    out
}

pub(crate) fn format_gaps(gaps: &[ContentGap]) -> String {
    if gaps.is_empty() {
        return "no content gaps found\n".to_string();
    }
    let mut out = String::new();
    for gap in gaps {
        let _ = writeln!(
            out,
            "- {} (opportunity {:.3}); try: {}",
            gap.description,
            gap.opportunity_score,
            gap.suggested_content_types.join(", ")
        );
    }
    out
}

pub(crate) fn format_influencers(profiles: &[InfluencerProfile]) -> String {
    if profiles.is_empty() {
        return "no recurring authors found\n".to_string();
    }
    let mut out = String::new();
    for profile in profiles {
        let _ = writeln!(
            out,
            "- {} on {} ({} items, ~{} followers, potential {:.3}); themes: {}",
            profile.name,
            profile.platform,
            profile.content_count,
            profile.follower_estimate,
            profile.collaboration_potential,
            profile.content_themes.join(", ")
        );
    }
    out
}
