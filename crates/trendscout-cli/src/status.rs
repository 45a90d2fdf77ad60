//! Engine status: identity pool health, platforms, browser and cache.

use std::time::Duration;

use trendscout_browser::{find_chrome_executable, IdentityPool, ProxyLease};
use trendscout_core::EngineConfig;

/// Print pool statistics and environment facts.
///
/// With `probe_url`, every configured proxy is probed once first so the
/// statistics reflect live reachability.
///
/// # Errors
///
/// Returns an error if the identity pool cannot be built from `config`.
pub(crate) async fn run_status(
    config: &EngineConfig,
    probe_url: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let pool = IdentityPool::from_config(config)?;

    if let Some(url) = probe_url {
        let timeout = Duration::from_secs(config.page_load_timeout_secs.min(15));
        for record in pool.records() {
            let lease = ProxyLease {
                id: record.id,
                endpoint: record.endpoint,
            };
            let fingerprint = pool.next_fingerprint();
            match pool.probe(&lease, &fingerprint, url, timeout).await {
                Ok(latency) => {
                    tracing::info!(
                        proxy = %lease.endpoint,
                        latency_ms = latency.as_millis(),
                        "proxy reachable"
                    );
                }
                Err(e) => tracing::warn!(proxy = %lease.endpoint, error = %e, "proxy unreachable"),
            }
        }
    }

    let stats = pool.stats();
    let browser = find_chrome_executable(config.chrome_executable.as_deref());
    let platforms: Vec<String> = config.platforms.iter().map(ToString::to_string).collect();

    if json {
        return crate::report::print_json(&serde_json::json!({
            "pool": {
                "total": stats.total,
                "active": stats.active,
                "total_requests": stats.total_requests,
                "success_rate": stats.success_rate,
                "average_latency_ms": stats.average_latency_ms,
                "fingerprints": pool.fingerprints().len(),
            },
            "platforms": platforms,
            "browser_executable": browser,
            "cache": {
                "enabled": config.cache_enabled,
                "dir": config.cache_dir.display().to_string(),
                "ttl_hours": config.cache_ttl_hours,
            },
            "transcript_service": config.transcript_url,
        }));
    }

    println!("identity pool");
    println!("  proxies:      {} ({} active)", stats.total, stats.active);
    println!("  fingerprints: {}", pool.fingerprints().len());
    println!("  requests:     {}", stats.total_requests);
    println!("  success rate: {:.1}%", stats.success_rate * 100.0);
    println!("  avg latency:  {:.0} ms", stats.average_latency_ms);
    for record in pool.records() {
        println!(
            "  - {} {}: {} ok / {} failed",
            record.id,
            record.endpoint,
            record.success_count,
            record.failure_count
        );
    }
    println!("platforms:      {}", platforms.join(", "));
    println!(
        "browser:        {}",
        browser.as_deref().unwrap_or("not found (set CHROME_EXECUTABLE)")
    );
    if config.cache_enabled {
        println!(
            "cache:          {} (ttl {}h)",
            config.cache_dir.display(),
            config.cache_ttl_hours
        );
    } else {
        println!("cache:          disabled");
    }
    Ok(())
}
