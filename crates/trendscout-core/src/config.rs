use std::path::PathBuf;

use crate::engine_config::{DelayRange, EngineConfig, ResultLimits};
use crate::{ConfigError, Platform};

/// Load engine configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if any value is malformed or out of range.
pub fn load_engine_config() -> Result<EngineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_engine_config_from_env()
}

/// Load engine configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if any value is malformed or out of range.
pub fn load_engine_config_from_env() -> Result<EngineConfig, ConfigError> {
    build_engine_config(|key| std::env::var(key))
}

/// Build engine configuration using the provided env-var lookup function.
///
/// Every variable is optional; defaults match [`EngineConfig::default`].
#[allow(clippy::too_many_lines)]
fn build_engine_config<F>(lookup: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_probability = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !(0.0..=1.0).contains(&value) {
            return Err(invalid(var, format!("{value} is outside [0, 1]")));
        }
        Ok(value)
    };

    let parse_bool = |var: &str, default: &str| -> Result<bool, ConfigError> {
        let raw = or_default(var, default);
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(var, format!("expected a boolean, got '{other}'"))),
        }
    };

    let parse_delay =
        |prefix: &str, min_default: &str, max_default: &str| -> Result<DelayRange, ConfigError> {
            let min_var = format!("{prefix}_MIN_MS");
            let max_var = format!("{prefix}_MAX_MS");
            let min_ms = parse_u64(&min_var, min_default)?;
            let max_ms = parse_u64(&max_var, max_default)?;
            DelayRange::new(min_ms, max_ms).ok_or_else(|| {
                invalid(
                    &min_var,
                    format!("minimum {min_ms}ms exceeds maximum {max_ms}ms"),
                )
            })
        };

    let platforms = parse_platforms(&or_default(
        "TRENDSCOUT_PLATFORMS",
        "google,youtube,reddit,twitter",
    ))
    .map_err(|reason| invalid("TRENDSCOUT_PLATFORMS", reason))?;

    let log_level = or_default("TRENDSCOUT_LOG_LEVEL", "info");
    let page_load_timeout_secs = parse_u64("TRENDSCOUT_PAGE_LOAD_TIMEOUT_SECS", "30")?;
    let driver_budget_secs = parse_u64("TRENDSCOUT_DRIVER_BUDGET_SECS", "60")?;
    if page_load_timeout_secs == 0 {
        return Err(invalid(
            "TRENDSCOUT_PAGE_LOAD_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let action_delay = parse_delay("TRENDSCOUT_ACTION_DELAY", "2000", "8000")?;
    let typing_delay = parse_delay("TRENDSCOUT_TYPING_DELAY", "50", "200")?;
    let platform_delay = parse_delay("TRENDSCOUT_PLATFORM_DELAY", "3000", "7000")?;
    let subcommunity_delay = parse_delay("TRENDSCOUT_SUBCOMMUNITY_DELAY", "2000", "4000")?;

    let scroll_probability = parse_probability("TRENDSCOUT_SCROLL_PROBABILITY", "0.6")?;
    let pointer_probability = parse_probability("TRENDSCOUT_POINTER_PROBABILITY", "0.7")?;
    let min_record_confidence = parse_probability("TRENDSCOUT_MIN_RECORD_CONFIDENCE", "0.6")?;

    let proxy_max_failures = parse_u32("TRENDSCOUT_PROXY_MAX_FAILURES", "3")?.max(1);
    let proxies = optional("TRENDSCOUT_PROXIES")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let proxy_file = optional("TRENDSCOUT_PROXY_FILE").map(PathBuf::from);
    let fingerprints_path = optional("TRENDSCOUT_FINGERPRINTS_PATH").map(PathBuf::from);
    let chrome_executable = optional("CHROME_EXECUTABLE");
    let headless = parse_bool("TRENDSCOUT_HEADLESS", "true")?;
    let session_init_attempts = parse_u32("TRENDSCOUT_SESSION_INIT_ATTEMPTS", "2")?.max(1);

    let result_limits = ResultLimits {
        google: parse_usize("TRENDSCOUT_GOOGLE_LIMIT", "15")?,
        youtube: parse_usize("TRENDSCOUT_YOUTUBE_LIMIT", "10")?,
        reddit: parse_usize("TRENDSCOUT_REDDIT_LIMIT", "15")?,
        twitter: parse_usize("TRENDSCOUT_TWITTER_LIMIT", "10")?,
    }
    .clamped();

    let min_topic_platforms = parse_usize("TRENDSCOUT_MIN_TOPIC_PLATFORMS", "2")?.max(2);
    let min_topic_records = parse_usize("TRENDSCOUT_MIN_TOPIC_RECORDS", "3")?.max(3);
    let max_topic_candidates = parse_usize("TRENDSCOUT_MAX_TOPIC_CANDIDATES", "50")?;
    let gap_top_n = parse_usize("TRENDSCOUT_GAP_TOP_N", "10")?;

    let cache_enabled = parse_bool("TRENDSCOUT_CACHE_ENABLED", "true")?;
    let cache_dir = PathBuf::from(or_default("TRENDSCOUT_CACHE_DIR", "./data/cache"));
    let cache_ttl_hours = parse_u64("TRENDSCOUT_CACHE_TTL_HOURS", "6")?;

    let transcript_url = optional("TRENDSCOUT_TRANSCRIPT_URL");
    let transcript_concurrency = parse_usize("TRENDSCOUT_TRANSCRIPT_CONCURRENCY", "3")?.max(1);

    Ok(EngineConfig {
        log_level,
        platforms,
        page_load_timeout_secs,
        driver_budget_secs,
        action_delay,
        typing_delay,
        platform_delay,
        subcommunity_delay,
        scroll_probability,
        pointer_probability,
        proxy_max_failures,
        proxies,
        proxy_file,
        fingerprints_path,
        chrome_executable,
        headless,
        session_init_attempts,
        result_limits,
        min_record_confidence,
        min_topic_platforms,
        min_topic_records,
        max_topic_candidates,
        gap_top_n,
        cache_enabled,
        cache_dir,
        cache_ttl_hours,
        transcript_url,
        transcript_concurrency,
    })
}

/// Parse a comma-separated platform list, preserving order and dropping duplicates.
fn parse_platforms(raw: &str) -> Result<Vec<Platform>, String> {
    let mut platforms = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let platform: Platform = part.parse().map_err(|e| format!("{e}"))?;
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    if platforms.is_empty() {
        return Err("at least one platform must be configured".to_string());
    }
    Ok(platforms)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
