use std::time::Duration;

use trendscout_browser::scripted::{ScriptedSessionFactory, ScriptedSite};
use trendscout_browser::{
    BehaviorSettings, CancellationToken, IdentityPool, SessionError, SessionFactory,
};

const LANDING: &str = r#"<html><body>
    <form><textarea name="q"></textarea></form>
</body></html>"#;

const RESULTS: &str = r#"<html><body>
    <div class="g"><h3>First</h3></div>
    <div class="g"><h3>Second</h3></div>
</body></html>"#;

fn site() -> ScriptedSite {
    ScriptedSite::new()
        .page("https://search.test/", LANDING)
        .results("https://search.test/", RESULTS)
        .hang("https://slow.test/")
        .fail("https://proxy.test/", "net::ERR_PROXY_CONNECTION_FAILED")
}

fn pool() -> IdentityPool {
    IdentityPool::new(Vec::new(), Vec::new(), 3)
}

// ---------------------------------------------------------------------------
// Navigation and typing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn types_query_per_character_then_submits() {
    let factory = ScriptedSessionFactory::new(site());
    let stats = factory.stats();
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();

    session.navigate("https://search.test/", &cancel).await.unwrap();
    let input = session
        .type_into(&["input[name=\"q\"]", "textarea[name=\"q\"]"], "ai tools", &cancel)
        .await
        .unwrap();
    assert_eq!(input.candidate, "textarea[name=\"q\"]");
    assert_eq!(input.index, 1);
    session.submit().await.unwrap();

    assert_eq!(stats.keystrokes(), "ai tools".chars().count());
    assert_eq!(stats.submissions(), vec!["ai tools".to_string()]);

    let found = session.find(&["div.g"]).await.unwrap();
    assert_eq!(found.elements.len(), 2);

    session.simulate(&cancel).await.unwrap();
    session.close().await;
    assert_eq!(stats.open(), 0);
}

#[tokio::test]
async fn find_exhausts_all_candidates() {
    let factory = ScriptedSessionFactory::new(site());
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    session.navigate("https://search.test/", &cancel).await.unwrap();
    let err = session.find(&["div.g", ".yuRUbf"]).await.unwrap_err();
    assert!(matches!(err, SessionError::SelectorExhausted { ref tried } if tried.len() == 2));
    session.close().await;
}

#[tokio::test]
async fn hung_navigation_times_out() {
    let factory =
        ScriptedSessionFactory::new(site()).with_page_load_timeout(Duration::from_millis(20));
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    let err = session.navigate("https://slow.test/", &cancel).await.unwrap_err();
    assert!(matches!(err, SessionError::NavigationTimeout { .. }));
    session.close().await;
}

#[tokio::test]
async fn cancellation_aborts_navigation() {
    let factory = ScriptedSessionFactory::new(site());
    let stats = factory.stats();
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });
    let err = session.navigate("https://slow.test/", &cancel).await.unwrap_err();
    assert!(matches!(err, SessionError::Cancelled));
    session.close().await;
    assert_eq!(stats.open(), 0);
}

#[tokio::test]
async fn proxy_errors_are_classified() {
    let factory = ScriptedSessionFactory::new(site());
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    let err = session.navigate("https://proxy.test/", &cancel).await.unwrap_err();
    assert!(matches!(err, SessionError::Proxy(_)));
    assert!(err.is_identity_failure());
    session.close().await;
}

// ---------------------------------------------------------------------------
// Waiting for markers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wait_for_stops_on_interstitial() {
    let blocked = ScriptedSite::new().page(
        "https://blocked.test/",
        "<html><body><form id=\"captcha-form\">verify you are human</form></body></html>",
    );
    let factory = ScriptedSessionFactory::new(blocked);
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    session.navigate("https://blocked.test/", &cancel).await.unwrap();
    let outcome = session
        .wait_for(&["div.g"], Duration::from_secs(5), &cancel, |html| {
            html.contains("captcha").then(|| "captcha".to_string())
        })
        .await
        .unwrap();
    assert_eq!(outcome, Err("captcha".to_string()));
    session.close().await;
}

#[tokio::test]
async fn wait_for_gives_up_after_timeout() {
    let factory = ScriptedSessionFactory::new(site());
    let cancel = CancellationToken::new();
    let session = factory.create_session(&pool().acquire()).await.unwrap();
    session.navigate("https://search.test/", &cancel).await.unwrap();
    let err = session
        .wait_for(&["div.g"], Duration::ZERO, &cancel, |_| None::<String>)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SelectorExhausted { .. }));
    session.close().await;
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn factory_failures_are_browser_init_errors() {
    let factory = ScriptedSessionFactory::new(site()).failing_first(1);
    let stats = factory.stats();
    let identity = pool().acquire();
    let first = factory.create_session(&identity).await;
    assert!(matches!(first, Err(SessionError::BrowserInit(_))));
    let second = factory.create_session(&identity).await.unwrap();
    second.close().await;
    assert_eq!(stats.created(), 1);
    assert_eq!(stats.closed(), 1);
    assert_eq!(stats.identities().len(), 2);
}

#[tokio::test]
async fn factory_sessions_follow_configured_behavior() {
    let still = ScriptedSessionFactory::new(site()).with_behavior(BehaviorSettings {
        scroll_probability: 0.0,
        pointer_probability: 0.0,
    });
    let busy = ScriptedSessionFactory::new(site()).with_behavior(BehaviorSettings {
        scroll_probability: 1.0,
        pointer_probability: 1.0,
    });
    let cancel = CancellationToken::new();
    let identity = pool().acquire();

    for factory in [&still, &busy] {
        let session = factory.create_session(&identity).await.unwrap();
        for _ in 0..5 {
            session.simulate(&cancel).await.unwrap();
        }
        session.close().await;
    }

    assert_eq!(still.stats().scrolls(), 0);
    assert_eq!(still.stats().pointer_moves(), 0);
    assert_eq!(busy.stats().scrolls(), 5);
    assert_eq!(busy.stats().pointer_moves(), 5);
}
