//! Multi-query analysis: crawl, enrich, filter, extract, cache.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use trendscout_analysis::{
    cache_key, quality_filter, ArticleInput, TopicExtractor, TopicSettings, TrendCache,
    TrendingTopic,
};
use trendscout_browser::CancellationToken;
use trendscout_core::{ContentRecord, EngineConfig, TimeRange};
use trendscout_crawler::{
    enrich_video_records, CrawlError, CrawlOrchestrator, HttpTranscriptService, TranscriptService,
};

/// Result of one `analyze` call.
#[derive(Debug)]
pub(crate) struct Analysis {
    pub(crate) topics: Vec<TrendingTopic>,
    /// Records that reached topic extraction; `0` on a cache hit.
    pub(crate) records: usize,
    pub(crate) from_cache: bool,
}

pub(crate) struct TrendPipeline {
    orchestrator: CrawlOrchestrator,
    extractor: TopicExtractor,
    cache: Option<TrendCache>,
    transcripts: Option<Arc<dyn TranscriptService>>,
    transcript_concurrency: usize,
    min_record_confidence: f64,
}

impl TrendPipeline {
    /// # Errors
    ///
    /// Returns an error if the transcript client cannot be built.
    pub(crate) fn new(
        config: &EngineConfig,
        orchestrator: CrawlOrchestrator,
    ) -> anyhow::Result<Self> {
        let transcripts = match config.transcript_url.as_deref() {
            Some(url) => {
                let service = HttpTranscriptService::new(url, config.page_load_timeout())
                    .map_err(|e| anyhow::anyhow!("failed to build transcript client: {e}"))?;
                Some(Arc::new(service) as Arc<dyn TranscriptService>)
            }
            None => None,
        };
        Ok(Self {
            orchestrator,
            extractor: TopicExtractor::new(TopicSettings::from_config(config)),
            cache: TrendCache::from_config(config),
            transcripts,
            transcript_concurrency: config.transcript_concurrency,
            min_record_confidence: config.min_record_confidence,
        })
    }

    #[must_use]
    pub(crate) fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Crawl every query in turn and rank the union of their records.
    ///
    /// A query whose crawl comes back empty is logged and skipped. Articles
    /// join the batch before filtering and bypass the cache.
    ///
    /// # Errors
    ///
    /// [`CrawlError::EmptyBatch`] when no query produced a record and no
    /// article was given, or [`CrawlError::Cancelled`].
    pub(crate) async fn analyze(
        &self,
        queries: &[String],
        time_range: TimeRange,
        articles: Vec<ArticleInput>,
        cancel: &CancellationToken,
    ) -> Result<Analysis, CrawlError> {
        let cache = self.cache.as_ref().filter(|_| articles.is_empty());
        let key = cache_key(queries, time_range, Utc::now());
        if let Some(topics) = cache.and_then(|c| c.load(&key, Utc::now())) {
            tracing::info!(topics = topics.len(), "serving cached analysis");
            return Ok(Analysis {
                topics,
                records: 0,
                from_cache: true,
            });
        }

        let mut records = self.crawl(queries, time_range, cancel).await?;
        if records.is_empty() && articles.is_empty() {
            return Err(CrawlError::EmptyBatch {
                query: queries.join(", "),
            });
        }

        if let Some(service) = &self.transcripts {
            records =
                enrich_video_records(Arc::clone(service), records, self.transcript_concurrency)
                    .await;
        }

        let now = Utc::now();
        records.extend(articles.into_iter().filter_map(|a| a.into_record(now)));
        let crawled = records.len();
        let records = quality_filter(records, self.min_record_confidence);
        tracing::debug!(
            crawled,
            kept = records.len(),
            "records passed the quality filter"
        );

        let topics = self.extractor.extract_at(&records, now);
        if let Some(cache) = cache {
            if !topics.is_empty() {
                cache.save(&key, &topics, now);
            }
        }
        Ok(Analysis {
            topics,
            records: records.len(),
            from_cache: false,
        })
    }

    async fn crawl(
        &self,
        queries: &[String],
        time_range: TimeRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentRecord>, CrawlError> {
        let mut records = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0
                && self
                    .orchestrator
                    .pacing()
                    .platform_gap
                    .wait(cancel)
                    .await
                    .is_err()
            {
                return Err(CrawlError::Cancelled);
            }
            match self
                .orchestrator
                .search_all_platforms(query, time_range, cancel)
                .await
            {
                Ok(batch) => {
                    tracing::info!(
                        query = %query,
                        count = batch.records.len(),
                        "query crawled"
                    );
                    // Overlapping queries surface the same items.
                    records.extend(
                        batch
                            .records
                            .into_iter()
                            .filter(|r| r.url.is_empty() || seen_urls.insert(r.url.clone())),
                    );
                }
                Err(CrawlError::EmptyBatch { query }) => {
                    tracing::warn!(query = %query, "no platform returned results; skipping query");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use trendscout_browser::scripted::{ScriptedSessionFactory, ScriptedSite, ScriptedStats};
    use trendscout_browser::{IdentityPool, Pacing};
    use trendscout_core::Platform;

    use super::*;

    const GOOGLE_HOME: &str =
        r#"<html><body><form><textarea name="q"></textarea></form></body></html>"#;

    const GOOGLE_RESULTS: &str = r#"<html><body><div id="search">
        <div class="g"><a href="https://blog.example.com/ai-guide"><h3>AI automation guide</h3></a>
          <div class="VwiC3b">Automate a side business.</div></div>
        <div class="g"><a href="https://tools.example.net/list"><h3>AI automation tools</h3></a></div>
    </div></body></html>"#;

    fn google_only() -> EngineConfig {
        EngineConfig {
            platforms: vec![Platform::Google],
            cache_dir: std::env::temp_dir()
                .join(format!("trendscout-cli-{}", uuid::Uuid::new_v4())),
            ..EngineConfig::default()
        }
    }

    fn pipeline(config: &EngineConfig, site: ScriptedSite) -> (TrendPipeline, Arc<ScriptedStats>) {
        let factory = ScriptedSessionFactory::new(site);
        let stats = factory.stats();
        let orchestrator = CrawlOrchestrator::new(
            config,
            Arc::new(factory),
            Arc::new(IdentityPool::new(Vec::new(), Vec::new(), 3)),
            Pacing::instant(),
        )
        .with_retry_backoff(Duration::ZERO);
        (TrendPipeline::new(config, orchestrator).unwrap(), stats)
    }

    fn healthy_site() -> ScriptedSite {
        ScriptedSite::new()
            .page("https://www.google.com/", GOOGLE_HOME)
            .results("https://www.google.com/", GOOGLE_RESULTS)
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn union_of_failed_queries_is_an_empty_batch() {
        let config = google_only();
        let site = ScriptedSite::new().fail("https://www.google.com/", "net::ERR_CONNECTION_RESET");
        let (pipeline, stats) = pipeline(&config, site);

        let err = pipeline
            .analyze(
                &queries(&["a", "b"]),
                TimeRange::Week,
                Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::EmptyBatch { ref query } if query == "a, b"));
        assert!(stats.created() >= 2, "both queries attempted");
        assert_eq!(stats.open(), 0);
    }

    #[tokio::test]
    async fn overlapping_queries_are_deduplicated_by_url() {
        let config = google_only();
        let (pipeline, stats) = pipeline(&config, healthy_site());

        let analysis = pipeline
            .without_cache()
            .analyze(
                &queries(&["ai automation", "automation tools"]),
                TimeRange::Week,
                Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(stats.created(), 2);
        assert_eq!(analysis.records, 2);
        assert!(!analysis.from_cache);
        // One platform cannot validate a topic.
        assert!(analysis.topics.is_empty());
    }

    #[tokio::test]
    async fn articles_join_the_crawled_batch() {
        let config = google_only();
        let (pipeline, _) = pipeline(&config, healthy_site());
        let article = ArticleInput {
            title: "AI automation explained".to_string(),
            content: "AI automation for a side business.".to_string(),
            url: Some("https://news.example.org/ai".to_string()),
        };

        let analysis = pipeline
            .analyze(
                &queries(&["ai automation"]),
                TimeRange::Day,
                vec![article],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        // The article is a search-engine record, so only one platform remains.
        assert_eq!(analysis.records, 3);
        assert!(analysis.topics.is_empty());
    }

    #[tokio::test]
    async fn cached_topics_skip_the_crawl() {
        let config = google_only();
        let (pipeline, stats) = pipeline(&config, healthy_site());
        let qs = queries(&["ai automation"]);
        let cache = TrendCache::from_config(&config).unwrap();
        let topics = TopicExtractor::default().extract_at(&[], Utc::now());
        cache.save(&cache_key(&qs, TimeRange::Week, Utc::now()), &topics, Utc::now());

        let analysis = pipeline
            .analyze(&qs, TimeRange::Week, Vec::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(analysis.from_cache);
        assert_eq!(stats.created(), 0);
        std::fs::remove_dir_all(&config.cache_dir).ok();
    }

    #[tokio::test]
    async fn cancelled_run_surfaces_cancellation() {
        let config = google_only();
        let (pipeline, stats) = pipeline(&config, healthy_site());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline
            .without_cache()
            .analyze(&queries(&["x"]), TimeRange::Week, Vec::new(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, CrawlError::Cancelled));
        assert_eq!(stats.created(), 0);
    }
}
