//! Flat-file cache of ranked topics, keyed by query set and 6-hour bucket.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use trendscout_core::{EngineConfig, TimeRange};

use crate::error::AnalysisError;
use crate::topics::TrendingTopic;

const BUCKET_SECONDS: i64 = 6 * 60 * 60;

/// On-disk shape of one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheFile {
    pub timestamp: DateTime<Utc>,
    pub topics: Vec<TrendingTopic>,
}

/// Stable key for a query set at `now`.
///
/// Queries are trimmed, lowercased, deduplicated and sorted, so order and
/// casing do not change the key. The key rolls over every six hours.
#[must_use]
pub fn cache_key(queries: &[String], time_range: TimeRange, now: DateTime<Utc>) -> String {
    let mut normalized: Vec<String> = queries
        .iter()
        .map(|q| q.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|q| !q.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();

    let bucket = now.timestamp().div_euclid(BUCKET_SECONDS);
    let material = format!("{}|{time_range}|{bucket}", normalized.join("\n"));
    format!("{:x}", Sha256::digest(material.as_bytes()))
}

#[derive(Debug, Clone)]
pub struct TrendCache {
    dir: PathBuf,
    ttl: Duration,
}

impl TrendCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    /// `None` when caching is disabled.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let ttl = i64::try_from(config.cache_ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        config
            .cache_enabled
            .then(|| Self::new(&config.cache_dir, ttl))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("trends-{key}.json"))
    }

    /// Fresh cached topics, or `None` on a miss.
    ///
    /// Unreadable, malformed and expired entries are all misses.
    #[must_use]
    pub fn load(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<TrendingTopic>> {
        match self.try_read(key) {
            Ok(Some(file)) if now - file.timestamp <= self.ttl => {
                tracing::debug!(key, topics = file.topics.len(), "cache hit");
                Some(file.topics)
            }
            Ok(Some(file)) => {
                tracing::debug!(key, written = %file.timestamp, "cache entry expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Writes `topics`; failures are logged and otherwise ignored.
    pub fn save(&self, key: &str, topics: &[TrendingTopic], now: DateTime<Utc>) {
        if let Err(e) = self.try_write(key, topics, now) {
            tracing::warn!(key, error = %e, "failed to write cache entry");
        }
    }

    /// # Errors
    ///
    /// Returns [`AnalysisError::CacheIo`] or [`AnalysisError::CacheJson`] when
    /// the entry exists but cannot be read or parsed.
    pub fn try_read(&self, key: &str) -> Result<Option<CacheFile>, AnalysisError> {
        let path = self.path_for(key);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(AnalysisError::CacheIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| AnalysisError::CacheJson {
                path: path.display().to_string(),
                source,
            })
    }

    /// Writes through a temporary sibling and renames it into place.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::CacheIo`] or [`AnalysisError::CacheJson`].
    pub fn try_write(
        &self,
        key: &str,
        topics: &[TrendingTopic],
        now: DateTime<Utc>,
    ) -> Result<(), AnalysisError> {
        let path = self.path_for(key);
        let io_err = |source| AnalysisError::CacheIo {
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let file = CacheFile {
            timestamp: now,
            topics: topics.to_vec(),
        };
        let body = serde_json::to_vec_pretty(&file).map_err(|source| AnalysisError::CacheJson {
            path: path.display().to_string(),
            source,
        })?;

        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        if let Err(e) = std::fs::write(&tmp, body).and_then(|()| std::fs::rename(&tmp, &path)) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::debug!(
                        path = %tmp.display(),
                        error = %cleanup,
                        "failed to remove temporary cache file"
                    );
                }
            }
            return Err(io_err(e));
        }
        tracing::debug!(key, topics = topics.len(), "cache entry written");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
