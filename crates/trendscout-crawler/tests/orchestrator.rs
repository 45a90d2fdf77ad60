use std::sync::Arc;
use std::time::Duration;

use trendscout_browser::scripted::{ScriptedSessionFactory, ScriptedSite, ScriptedStats};
use trendscout_browser::{CancellationToken, IdentityPool, Pacing, ProxyEndpoint};
use trendscout_core::{EngineConfig, Platform, PlatformMetrics, ResultLimits, TimeRange};
use trendscout_crawler::{driver_for, CrawlError, CrawlOrchestrator};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const GOOGLE_HOME: &str = r#"<html><body><form><textarea name="q"></textarea></form></body></html>"#;

const GOOGLE_RESULTS: &str = r#"<html><body><div id="search">
    <div class="g"><a href="https://blog.example.com/ai-guide"><h3>AI automation guide</h3></a>
      <div class="VwiC3b">Automate a side business.</div></div>
    <div class="g"><a href="https://tools.example.net/list"><h3>Best automation tools</h3></a></div>
</div></body></html>"#;

const YOUTUBE_HOME: &str = r#"<html><body><input id="search" name="search_query"></body></html>"#;

const YOUTUBE_RESULTS: &str = r#"<html><body>
    <ytd-video-renderer>
      <a id="video-title" href="/watch?v=vid1">AI automation tutorial</a>
      <ytd-channel-name><a href="/@maker">Maker</a></ytd-channel-name>
      <div id="metadata-line"><span>25K views</span></div>
      <div id="description-text">Build an agent.</div>
    </ytd-video-renderer>
</body></html>"#;

const REDDIT_SEARCH: &str = r#"<html><body><form id="search"><input name="q" type="text"></form></body></html>"#;

const TWITTER_LOGIN_WALL: &str = r#"<html><body>
    <h1>Sign in to X</h1><a data-testid="loginButton" href="/login">Log in</a>
</body></html>"#;

fn reddit_results(sub: &str) -> String {
    format!(
        r#"<html><body>
        <div class="search-result search-result-link" data-score="150" data-comments-count="20">
          <a class="search-title" href="/r/{sub}/comments/a1/automation_tips/">Automation tips from r/{sub}</a>
          <a class="author" href="/user/poster_{sub}">poster_{sub}</a>
        </div>
        </body></html>"#
    )
}

fn reddit_listing(sub: &str, posts: usize) -> String {
    let items: String = (1..=posts)
        .map(|i| {
            format!(
                r#"<div class="search-result search-result-link" data-score="{i}" data-comments-count="0">
                  <a class="search-title" href="/r/{sub}/comments/p{i}/post_{i}/">Side income post {i}</a>
                  <a class="author" href="/user/member_{i}">member_{i}</a>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{items}</body></html>")
}

fn healthy_site() -> ScriptedSite {
    let mut site = ScriptedSite::new()
        .page("https://www.google.com/", GOOGLE_HOME)
        .results("https://www.google.com/", GOOGLE_RESULTS)
        .page("https://www.youtube.com/", YOUTUBE_HOME)
        .results("https://www.youtube.com/", YOUTUBE_RESULTS)
        .page("https://x.com/explore", TWITTER_LOGIN_WALL);
    for sub in ["entrepreneur", "sidehustle", "passive_income"] {
        let prefix = format!("https://old.reddit.com/r/{sub}/");
        site = site
            .page(&prefix, REDDIT_SEARCH)
            .results(&prefix, reddit_results(sub));
    }
    site
}

fn orchestrator(
    config: &EngineConfig,
    factory: ScriptedSessionFactory,
    pool: IdentityPool,
) -> (CrawlOrchestrator, Arc<ScriptedStats>) {
    let stats = factory.stats();
    let orchestrator = CrawlOrchestrator::new(
        config,
        Arc::new(factory),
        Arc::new(pool),
        Pacing::instant(),
    )
    .with_retry_backoff(Duration::ZERO);
    (orchestrator, stats)
}

fn direct_pool() -> IdentityPool {
    IdentityPool::new(Vec::new(), Vec::new(), 3)
}

// ---------------------------------------------------------------------------
// Failure tolerance
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blocked_platform_does_not_abort_the_batch() {
    let config = EngineConfig::default();
    let (orchestrator, stats) = orchestrator(
        &config,
        ScriptedSessionFactory::new(healthy_site()),
        direct_pool(),
    );

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    let platforms: Vec<Platform> = batch.outcomes.iter().map(|o| o.platform).collect();
    assert_eq!(
        platforms,
        vec![Platform::Google, Platform::YouTube, Platform::Reddit, Platform::Twitter]
    );
    assert_eq!(batch.records.len(), 2 + 1 + 3);
    assert!(batch.records.iter().all(|r| r.platform() != Platform::Twitter));

    let twitter = &batch.outcomes[3];
    assert!(!twitter.succeeded());
    assert!(twitter.error.as_deref().unwrap().contains("blocked or challenged"));

    assert_eq!(stats.created(), 4, "one fresh session per platform");
    assert_eq!(stats.open(), 0, "every session released");
}

#[tokio::test]
async fn every_platform_failing_is_an_empty_batch() {
    let config = EngineConfig::default();
    let site = ScriptedSite::new()
        .fail("https://www.google.com/", "net::ERR_CONNECTION_RESET")
        .page("https://www.youtube.com/", "<html><body>nothing here</body></html>")
        .page("https://x.com/explore", TWITTER_LOGIN_WALL);
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let err = orchestrator
        .search_all_platforms("nothing", TimeRange::Day, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::EmptyBatch { ref query } if query == "nothing"));
    assert_eq!(stats.open(), 0);
}

#[tokio::test]
async fn empty_results_page_counts_as_success_with_no_records() {
    let config = EngineConfig {
        platforms: vec![Platform::Reddit, Platform::Google],
        ..EngineConfig::default()
    };
    let mut site = ScriptedSite::new()
        .page("https://www.google.com/", GOOGLE_HOME)
        .results("https://www.google.com/", GOOGLE_RESULTS);
    for sub in ["entrepreneur", "sidehustle", "passive_income"] {
        let prefix = format!("https://old.reddit.com/r/{sub}/");
        site = site
            .page(&prefix, REDDIT_SEARCH)
            .results(&prefix, r#"<html><body><div id="noresults">there doesn't seem to be anything here</div></body></html>"#);
    }
    let (orchestrator, _) = orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch.outcomes[0].succeeded());
    assert_eq!(batch.outcomes[0].count, 0);
    assert_eq!(batch.records.len(), 2);
}

#[tokio::test]
async fn forum_pass_failure_keeps_other_sub_communities() {
    let config = EngineConfig {
        platforms: vec![Platform::Reddit],
        ..EngineConfig::default()
    };
    let site = healthy_site().fail(
        "https://old.reddit.com/r/entrepreneur/",
        "net::ERR_CONNECTION_RESET",
    );
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Month, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(batch.records.len(), 2);
    assert!(batch.records.iter().all(|r| matches!(
        r.metrics,
        PlatformMetrics::Reddit { score: 150, comments: 20, .. }
    )));
    assert_eq!(stats.navigations().len(), 3);
    assert_eq!(stats.created(), 1, "all passes share one session");
}

#[tokio::test]
async fn forum_records_are_capped_at_the_platform_limit() {
    let config = EngineConfig {
        platforms: vec![Platform::Reddit],
        result_limits: ResultLimits {
            reddit: 16,
            ..EngineConfig::default().result_limits
        },
        ..EngineConfig::default()
    };
    let mut site = ScriptedSite::new();
    for sub in ["entrepreneur", "sidehustle", "passive_income"] {
        let prefix = format!("https://old.reddit.com/r/{sub}/");
        site = site
            .page(&prefix, REDDIT_SEARCH)
            .results(&prefix, reddit_listing(sub, 8));
    }
    let (orchestrator, _) = orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("side income", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    // Six per sub-community pass, cut to sixteen overall.
    assert_eq!(batch.records.len(), 16);
    assert_eq!(batch.outcomes[0].count, 16);
    let last_sub = batch
        .records
        .iter()
        .filter(|r| r.url.contains("/r/passive_income/"))
        .count();
    assert_eq!(last_sub, 4);
}

#[tokio::test]
async fn batch_is_ranked_by_confidence() {
    let config = EngineConfig::default();
    let (orchestrator, _) = orchestrator(
        &config,
        ScriptedSessionFactory::new(healthy_site()),
        direct_pool(),
    );

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch
        .records
        .windows(2)
        .all(|w| w[0].confidence_score >= w[1].confidence_score));
    assert_eq!(batch.records[0].platform(), Platform::YouTube);
    assert_eq!(
        batch.records.last().unwrap().url,
        "https://tools.example.net/list"
    );
}

#[tokio::test]
async fn consent_wall_fails_only_the_video_platform() {
    let config = EngineConfig {
        platforms: vec![Platform::YouTube, Platform::Google],
        ..EngineConfig::default()
    };
    let consent = r#"<html><body><form action="https://consent.youtube.com/save" method="POST">
        <button>Accept all</button></form></body></html>"#;
    let site = healthy_site().results("https://www.youtube.com/", consent);
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    let youtube = &batch.outcomes[0];
    assert!(youtube.error.as_deref().unwrap().contains("consent.youtube.com"));
    assert!(batch.outcomes[1].succeeded());
    assert_eq!(batch.records.len(), 2);
    assert_eq!(stats.open(), 0);
}

// ---------------------------------------------------------------------------
// Query entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn boosted_query_is_typed_per_character() {
    let config = EngineConfig {
        platforms: vec![Platform::YouTube],
        ..EngineConfig::default()
    };
    let (orchestrator, stats) = orchestrator(
        &config,
        ScriptedSessionFactory::new(healthy_site()),
        direct_pool(),
    );

    orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    let typed = "ai automation side hustle passive income tutorial";
    assert_eq!(stats.submissions(), vec![typed.to_string()]);
    assert_eq!(stats.keystrokes(), typed.chars().count());
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn launch_failure_retries_with_a_fresh_identity() {
    let config = EngineConfig {
        platforms: vec![Platform::Google],
        session_init_attempts: 2,
        ..EngineConfig::default()
    };
    let proxies = vec![
        "http://10.0.0.1:8080".parse::<ProxyEndpoint>().unwrap(),
        "http://10.0.0.2:8080".parse::<ProxyEndpoint>().unwrap(),
    ];
    let factory = ScriptedSessionFactory::new(healthy_site()).failing_first(1);
    let (orchestrator, stats) =
        orchestrator(&config, factory, IdentityPool::new(proxies, Vec::new(), 3));

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(batch.records.len(), 2);

    let identities = stats.identities();
    assert_eq!(identities.len(), 2);
    assert_ne!(identities[0], identities[1]);

    let records = orchestrator.pool().records();
    assert_eq!(records[0].failure_count, 1, "failed launch burns its proxy");
    assert_eq!(records[1].success_count, 1);
}

#[tokio::test]
async fn launch_failures_beyond_the_attempt_budget_fail_only_that_platform() {
    let config = EngineConfig {
        platforms: vec![Platform::Google, Platform::YouTube],
        session_init_attempts: 2,
        ..EngineConfig::default()
    };
    let factory = ScriptedSessionFactory::new(healthy_site()).failing_first(2);
    let (orchestrator, stats) = orchestrator(&config, factory, direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch.outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .contains("browser init failed"));
    assert!(batch.outcomes[1].succeeded());
    assert_eq!(stats.identities().len(), 3);
    assert_eq!(stats.open(), 0);
}

// ---------------------------------------------------------------------------
// Budgets and cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn hung_platform_is_cut_off_by_the_driver_budget() {
    let config = EngineConfig {
        platforms: vec![Platform::Google, Platform::YouTube],
        driver_budget_secs: 5,
        ..EngineConfig::default()
    };
    let site = healthy_site().hang("https://www.google.com/");
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch.outcomes[0]
        .error
        .as_deref()
        .unwrap()
        .contains("exceeded driver budget"));
    assert_eq!(batch.records.len(), 1);
    assert_eq!(stats.open(), 0, "hung session still released");
}

#[tokio::test(start_paused = true)]
async fn budget_overrun_keeps_records_from_finished_passes() {
    let config = EngineConfig {
        platforms: vec![Platform::Reddit],
        driver_budget_secs: 5,
        ..EngineConfig::default()
    };
    let site = healthy_site().hang("https://old.reddit.com/r/sidehustle/");
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch.outcomes[0].succeeded());
    assert_eq!(batch.records.len(), 1);
    assert!(batch.records[0].url.contains("/r/entrepreneur/"));
    assert_eq!(stats.open(), 0);
}

#[tokio::test(start_paused = true)]
async fn forum_crawl_with_default_pacing_returns_records() {
    let config = EngineConfig {
        platforms: vec![Platform::Reddit],
        ..EngineConfig::default()
    };
    let pacing = Pacing::from_config(&config);
    let factory = ScriptedSessionFactory::new(healthy_site()).with_pacing(pacing.clone());
    let stats = factory.stats();
    let orchestrator =
        CrawlOrchestrator::new(&config, Arc::new(factory), Arc::new(direct_pool()), pacing);

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();

    assert!(batch.outcomes[0].succeeded());
    assert!(!batch.records.is_empty());
    assert!(batch.records.len() <= config.result_limits.reddit);
    assert_eq!(stats.open(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_navigation_releases_the_session() {
    let config = EngineConfig::default();
    let site = healthy_site().hang("https://www.google.com/");
    let (orchestrator, stats) =
        orchestrator(&config, ScriptedSessionFactory::new(site), direct_pool());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let err = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled));
    assert_eq!(stats.created(), 1);
    assert_eq!(stats.open(), 0);
}

#[tokio::test]
async fn already_cancelled_token_launches_nothing() {
    let config = EngineConfig::default();
    let (orchestrator, stats) = orchestrator(
        &config,
        ScriptedSessionFactory::new(healthy_site()),
        direct_pool(),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Cancelled));
    assert_eq!(stats.created(), 0);
}

#[tokio::test]
async fn with_drivers_limits_the_crawl() {
    let config = EngineConfig::default();
    let (orchestrator, stats) = orchestrator(
        &config,
        ScriptedSessionFactory::new(healthy_site()),
        direct_pool(),
    );
    let orchestrator = orchestrator.with_drivers(vec![driver_for(Platform::Google, &config)]);
    assert_eq!(orchestrator.platforms(), vec![Platform::Google]);

    let batch = orchestrator
        .search_all_platforms("ai automation", TimeRange::Week, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(batch.outcomes.len(), 1);
    assert_eq!(stats.created(), 1);
}
