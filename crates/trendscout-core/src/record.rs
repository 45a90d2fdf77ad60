//! Normalized content records produced by the platform drivers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Platform;

/// Platform-specific engagement signals.
///
/// Each variant carries the counters its platform exposes. Scoring code only
/// calls [`PlatformMetrics::engagement_score`] and never inspects raw keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformMetrics {
    /// Search-engine result; `ranking` is higher for earlier results.
    Google { ranking: u64 },
    YouTube { views: u64 },
    Reddit {
        score: u64,
        comments: u64,
        position: u64,
    },
    Twitter {
        retweets: u64,
        likes: u64,
        replies: u64,
    },
}

impl PlatformMetrics {
    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            PlatformMetrics::Google { .. } => Platform::Google,
            PlatformMetrics::YouTube { .. } => Platform::YouTube,
            PlatformMetrics::Reddit { .. } => Platform::Reddit,
            PlatformMetrics::Twitter { .. } => Platform::Twitter,
        }
    }

    /// Single comparable engagement number for this record.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn engagement_score(&self) -> f64 {
        let raw = match *self {
            PlatformMetrics::Google { ranking } => ranking,
            PlatformMetrics::YouTube { views } => views,
            PlatformMetrics::Reddit {
                score, comments, ..
            } => score.saturating_add(comments.saturating_mul(2)),
            PlatformMetrics::Twitter {
                retweets,
                likes,
                replies,
            } => retweets
                .saturating_mul(3)
                .saturating_add(likes)
                .saturating_add(replies.saturating_mul(2)),
        };
        raw as f64
    }

    #[allow(clippy::cast_precision_loss)]
    fn to_map(self) -> BTreeMap<String, f64> {
        let pairs: Vec<(&str, u64)> = match self {
            PlatformMetrics::Google { ranking } => vec![("ranking", ranking)],
            PlatformMetrics::YouTube { views } => vec![("views", views)],
            PlatformMetrics::Reddit {
                score,
                comments,
                position,
            } => vec![
                ("score", score),
                ("comments", comments),
                ("position", position),
            ],
            PlatformMetrics::Twitter {
                retweets,
                likes,
                replies,
            } => vec![("retweets", retweets), ("likes", likes), ("replies", replies)],
        };
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v as f64))
            .collect()
    }

    fn from_map(platform: Platform, map: &BTreeMap<String, f64>) -> Self {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let get = |key: &str| -> u64 {
            map.get(key)
                .copied()
                .filter(|v| v.is_finite())
                .map_or(0, |v| v.max(0.0).round() as u64)
        };
        match platform {
            Platform::Google => PlatformMetrics::Google {
                ranking: get("ranking"),
            },
            Platform::YouTube => PlatformMetrics::YouTube {
                views: get("views"),
            },
            Platform::Reddit => PlatformMetrics::Reddit {
                score: get("score"),
                comments: get("comments"),
                position: get("position"),
            },
            Platform::Twitter => PlatformMetrics::Twitter {
                retweets: get("retweets"),
                likes: get("likes"),
                replies: get("replies"),
            },
        }
    }
}

/// One scraped item, normalized across platforms.
///
/// Serializes to the wire shape
/// `{platform, title, content, url, author, engagement_metrics, confidence_score, scraped_at}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ContentRecordWire", try_from = "ContentRecordWire")]
pub struct ContentRecord {
    pub title: String,
    pub content: String,
    pub url: String,
    pub author: String,
    pub metrics: PlatformMetrics,
    /// Heuristic item quality in `[0, 1]`.
    pub confidence_score: f64,
    pub scraped_at: DateTime<Utc>,
}

impl ContentRecord {
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.metrics.platform()
    }

    #[must_use]
    pub fn engagement(&self) -> f64 {
        self.metrics.engagement_score()
    }

    /// Title and body joined for text analysis.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

#[derive(Serialize, Deserialize)]
struct ContentRecordWire {
    platform: Platform,
    title: String,
    #[serde(default)]
    content: String,
    url: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    engagement_metrics: BTreeMap<String, f64>,
    confidence_score: f64,
    scraped_at: DateTime<Utc>,
}

impl From<ContentRecord> for ContentRecordWire {
    fn from(r: ContentRecord) -> Self {
        ContentRecordWire {
            platform: r.metrics.platform(),
            engagement_metrics: r.metrics.to_map(),
            title: r.title,
            content: r.content,
            url: r.url,
            author: r.author,
            confidence_score: r.confidence_score,
            scraped_at: r.scraped_at,
        }
    }
}

impl TryFrom<ContentRecordWire> for ContentRecord {
    type Error = String;

    fn try_from(w: ContentRecordWire) -> Result<Self, Self::Error> {
        if !w.confidence_score.is_finite() || !(0.0..=1.0).contains(&w.confidence_score) {
            return Err(format!(
                "confidence_score {} outside [0, 1]",
                w.confidence_score
            ));
        }
        Ok(ContentRecord {
            metrics: PlatformMetrics::from_map(w.platform, &w.engagement_metrics),
            title: w.title,
            content: w.content,
            url: w.url,
            author: w.author,
            confidence_score: w.confidence_score,
            scraped_at: w.scraped_at,
        })
    }
}
