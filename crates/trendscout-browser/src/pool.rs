//! Process-wide identity pool.
//!
//! Proxies and fingerprints rotate independently: proxies are handed out
//! least-recently-used and health-tracked, fingerprints round-robin on their
//! own cursor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use trendscout_core::{ConfigError, EngineConfig};

use crate::error::SessionError;
use crate::fingerprint::{default_fingerprints, load_fingerprints, Fingerprint};
use crate::proxy::{load_proxy_file, parse_proxies, ProxyEndpoint};

/// Stable index of a proxy within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(usize);

impl std::fmt::Display for ProxyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proxy-{}", self.0)
    }
}

/// A proxy handed out by [`IdentityPool::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyLease {
    pub id: ProxyId,
    pub endpoint: ProxyEndpoint,
}

/// Egress proxy (if any are configured) plus a fingerprint for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub proxy: Option<ProxyLease>,
    pub fingerprint: Fingerprint,
}

impl Identity {
    /// Short description for logs; never includes credentials.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.proxy {
            Some(lease) => format!("{}@{} ({})", self.fingerprint.name, lease.endpoint, lease.id),
            None => format!("{}@direct", self.fingerprint.name),
        }
    }
}

/// Snapshot of one proxy's health counters.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityRecord {
    pub id: ProxyId,
    pub endpoint: ProxyEndpoint,
    pub success_count: u64,
    pub failure_count: u32,
    pub last_used: Option<DateTime<Utc>>,
    pub average_latency_ms: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub total: usize,
    pub active: usize,
    pub total_requests: u64,
    /// Successes over all reported outcomes; `0.0` before any report.
    pub success_rate: f64,
    /// Mean of per-proxy average latencies, over proxies with samples.
    pub average_latency_ms: f64,
}

#[derive(Debug)]
struct ProxyState {
    endpoint: ProxyEndpoint,
    success_count: u64,
    failure_count: u32,
    total_failures: u64,
    last_used: Option<DateTime<Utc>>,
    last_used_tick: u64,
    latency_total_ms: f64,
    latency_samples: u64,
    is_active: bool,
}

impl ProxyState {
    fn new(endpoint: ProxyEndpoint) -> Self {
        Self {
            endpoint,
            success_count: 0,
            failure_count: 0,
            total_failures: 0,
            last_used: None,
            last_used_tick: 0,
            latency_total_ms: 0.0,
            latency_samples: 0,
            is_active: true,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn average_latency_ms(&self) -> f64 {
        if self.latency_samples == 0 {
            0.0
        } else {
            self.latency_total_ms / self.latency_samples as f64
        }
    }
}

#[derive(Debug, Default)]
struct ProxyTable {
    proxies: Vec<ProxyState>,
    tick: u64,
}

#[derive(Debug)]
pub struct IdentityPool {
    table: Mutex<ProxyTable>,
    fingerprints: Vec<Fingerprint>,
    fingerprint_cursor: AtomicUsize,
    max_failures: u32,
}

impl IdentityPool {
    /// Build a pool. An empty fingerprint list falls back to the built-in set.
    #[must_use]
    pub fn new(proxies: Vec<ProxyEndpoint>, fingerprints: Vec<Fingerprint>, max_failures: u32) -> Self {
        let fingerprints = if fingerprints.is_empty() {
            default_fingerprints()
        } else {
            fingerprints
        };
        Self {
            table: Mutex::new(ProxyTable {
                proxies: proxies.into_iter().map(ProxyState::new).collect(),
                tick: 0,
            }),
            fingerprints,
            fingerprint_cursor: AtomicUsize::new(0),
            max_failures: max_failures.max(1),
        }
    }

    /// Build a pool from inline proxies, the proxy file, and the fingerprint
    /// catalogue named in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a proxy entry or the fingerprint file is invalid.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ConfigError> {
        let mut proxies = parse_proxies(config.proxies.iter().map(String::as_str))?;
        if let Some(path) = &config.proxy_file {
            proxies.extend(load_proxy_file(path)?);
        }
        let fingerprints = match &config.fingerprints_path {
            Some(path) => load_fingerprints(path)?,
            None => default_fingerprints(),
        };
        tracing::info!(
            proxies = proxies.len(),
            fingerprints = fingerprints.len(),
            "identity pool initialized"
        );
        Ok(Self::new(proxies, fingerprints, config.proxy_max_failures))
    }

    fn lock(&self) -> MutexGuard<'_, ProxyTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next proxy (if any are configured) and next fingerprint.
    #[must_use]
    pub fn acquire(&self) -> Identity {
        Identity {
            proxy: self.acquire_proxy(),
            fingerprint: self.next_fingerprint(),
        }
    }

    /// Least-recently-used active proxy.
    ///
    /// When every proxy is inactive the whole pool is reset first, so this only
    /// returns `None` for a pool with no proxies at all.
    #[must_use]
    pub fn acquire_proxy(&self) -> Option<ProxyLease> {
        let mut table = self.lock();
        if table.proxies.is_empty() {
            return None;
        }
        if !table.proxies.iter().any(|p| p.is_active) {
            tracing::warn!(
                total = table.proxies.len(),
                "all proxies inactive; resetting pool"
            );
            for proxy in &mut table.proxies {
                proxy.failure_count = 0;
                proxy.is_active = true;
            }
        }
        let index = table
            .proxies
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_active)
            .min_by_key(|(i, p)| (p.last_used_tick, *i))
            .map(|(i, _)| i)?;
        table.tick += 1;
        let tick = table.tick;
        let proxy = &mut table.proxies[index];
        proxy.last_used_tick = tick;
        proxy.last_used = Some(Utc::now());
        Some(ProxyLease {
            id: ProxyId(index),
            endpoint: proxy.endpoint.clone(),
        })
    }

    /// Next fingerprint in round-robin order.
    #[must_use]
    pub fn next_fingerprint(&self) -> Fingerprint {
        let i = self.fingerprint_cursor.fetch_add(1, Ordering::Relaxed);
        self.fingerprints[i % self.fingerprints.len()].clone()
    }

    /// Record a success: one prior failure is forgiven and latency is sampled.
    pub fn report_success(&self, id: ProxyId, latency: Duration) {
        let mut table = self.lock();
        let Some(proxy) = table.proxies.get_mut(id.0) else {
            return;
        };
        proxy.success_count += 1;
        proxy.failure_count = proxy.failure_count.saturating_sub(1);
        proxy.latency_total_ms += latency.as_secs_f64() * 1_000.0;
        proxy.latency_samples += 1;
    }

    /// Record a failure; the proxy is deactivated once it reaches the threshold.
    pub fn report_failure(&self, id: ProxyId) {
        let max_failures = self.max_failures;
        let mut table = self.lock();
        let Some(proxy) = table.proxies.get_mut(id.0) else {
            return;
        };
        proxy.failure_count += 1;
        proxy.total_failures += 1;
        if proxy.is_active && proxy.failure_count >= max_failures {
            proxy.is_active = false;
            tracing::warn!(
                proxy = %proxy.endpoint,
                failures = proxy.failure_count,
                "proxy deactivated"
            );
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> PoolStats {
        let table = self.lock();
        let successes: u64 = table.proxies.iter().map(|p| p.success_count).sum();
        let failures: u64 = table.proxies.iter().map(|p| p.total_failures).sum();
        let total_requests = successes + failures;
        let sampled: Vec<f64> = table
            .proxies
            .iter()
            .filter(|p| p.latency_samples > 0)
            .map(ProxyState::average_latency_ms)
            .collect();
        PoolStats {
            total: table.proxies.len(),
            active: table.proxies.iter().filter(|p| p.is_active).count(),
            total_requests,
            success_rate: if total_requests == 0 {
                0.0
            } else {
                successes as f64 / total_requests as f64
            },
            average_latency_ms: if sampled.is_empty() {
                0.0
            } else {
                sampled.iter().sum::<f64>() / sampled.len() as f64
            },
        }
    }

    #[must_use]
    pub fn records(&self) -> Vec<IdentityRecord> {
        self.lock()
            .proxies
            .iter()
            .enumerate()
            .map(|(i, p)| IdentityRecord {
                id: ProxyId(i),
                endpoint: p.endpoint.clone(),
                success_count: p.success_count,
                failure_count: p.failure_count,
                last_used: p.last_used,
                average_latency_ms: p.average_latency_ms(),
                is_active: p.is_active,
            })
            .collect()
    }

    #[must_use]
    pub fn fingerprints(&self) -> &[Fingerprint] {
        &self.fingerprints
    }

    /// Issue one GET to `probe_url` through the leased proxy and record the
    /// outcome against it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Proxy`] if the request fails or returns a
    /// non-success status.
    pub async fn probe(
        &self,
        lease: &ProxyLease,
        fingerprint: &Fingerprint,
        probe_url: &str,
        timeout: Duration,
    ) -> Result<Duration, SessionError> {
        let outcome = probe_once(&lease.endpoint, fingerprint, probe_url, timeout).await;
        match &outcome {
            Ok(latency) => self.report_success(lease.id, *latency),
            Err(e) => {
                tracing::warn!(proxy = %lease.endpoint, error = %e, "proxy probe failed");
                self.report_failure(lease.id);
            }
        }
        outcome
    }
}

async fn probe_once(
    endpoint: &ProxyEndpoint,
    fingerprint: &Fingerprint,
    probe_url: &str,
    timeout: Duration,
) -> Result<Duration, SessionError> {
    let proxy = reqwest::Proxy::all(endpoint.url_with_credentials())
        .map_err(|e| SessionError::Proxy(e.to_string()))?;
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in fingerprint.request_headers() {
        if let Ok(value) = reqwest::header::HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }
    let client = reqwest::Client::builder()
        .proxy(proxy)
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| SessionError::Proxy(e.to_string()))?;

    let started = Instant::now();
    let response = client
        .get(probe_url)
        .send()
        .await
        .map_err(|e| SessionError::Proxy(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SessionError::Proxy(format!(
            "probe returned HTTP {}",
            status.as_u16()
        )));
    }
    Ok(started.elapsed())
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
