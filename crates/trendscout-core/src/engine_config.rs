use std::path::PathBuf;
use std::time::Duration;

use crate::Platform;

/// Inclusive millisecond range that a pacing delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min_ms: u64,
    max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min_ms: 0,
        max_ms: 0,
    };

    /// Returns `None` when `min_ms > max_ms`.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Option<Self> {
        if min_ms > max_ms {
            None
        } else {
            Some(DelayRange { min_ms, max_ms })
        }
    }

    #[must_use]
    pub const fn min_ms(&self) -> u64 {
        self.min_ms
    }

    #[must_use]
    pub const fn max_ms(&self) -> u64 {
        self.max_ms
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

/// Per-platform caps on extracted results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultLimits {
    pub google: usize,
    pub youtube: usize,
    pub reddit: usize,
    pub twitter: usize,
}

impl ResultLimits {
    /// Allowed `(min, max)` cap for each platform.
    #[must_use]
    pub const fn bounds(platform: Platform) -> (usize, usize) {
        match platform {
            Platform::Google => (15, 20),
            Platform::YouTube => (10, 15),
            Platform::Reddit => (15, 25),
            Platform::Twitter => (10, 20),
        }
    }

    /// Clamp every cap into its platform's allowed range.
    #[must_use]
    pub fn clamped(self) -> Self {
        let clamp = |p: Platform, v: usize| {
            let (lo, hi) = Self::bounds(p);
            v.clamp(lo, hi)
        };
        ResultLimits {
            google: clamp(Platform::Google, self.google),
            youtube: clamp(Platform::YouTube, self.youtube),
            reddit: clamp(Platform::Reddit, self.reddit),
            twitter: clamp(Platform::Twitter, self.twitter),
        }
    }

    #[must_use]
    pub fn for_platform(&self, platform: Platform) -> usize {
        match platform {
            Platform::Google => self.google,
            Platform::YouTube => self.youtube,
            Platform::Reddit => self.reddit,
            Platform::Twitter => self.twitter,
        }
    }
}

impl Default for ResultLimits {
    fn default() -> Self {
        ResultLimits {
            google: 15,
            youtube: 10,
            reddit: 15,
            twitter: 10,
        }
    }
}

/// Immutable engine configuration, built once at startup and shared by reference.
#[derive(Clone, PartialEq)]
pub struct EngineConfig {
    pub log_level: String,
    pub platforms: Vec<Platform>,
    pub page_load_timeout_secs: u64,
    pub driver_budget_secs: u64,
    pub action_delay: DelayRange,
    pub typing_delay: DelayRange,
    pub platform_delay: DelayRange,
    pub subcommunity_delay: DelayRange,
    pub scroll_probability: f64,
    pub pointer_probability: f64,
    pub proxy_max_failures: u32,
    pub proxies: Vec<String>,
    pub proxy_file: Option<PathBuf>,
    pub fingerprints_path: Option<PathBuf>,
    pub chrome_executable: Option<String>,
    pub headless: bool,
    pub session_init_attempts: u32,
    pub result_limits: ResultLimits,
    pub min_record_confidence: f64,
    pub min_topic_platforms: usize,
    pub min_topic_records: usize,
    pub max_topic_candidates: usize,
    pub gap_top_n: usize,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl_hours: u64,
    pub transcript_url: Option<String>,
    pub transcript_concurrency: usize,
}

impl EngineConfig {
    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn driver_budget(&self) -> Duration {
        Duration::from_secs(self.driver_budget_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            log_level: "info".to_string(),
            platforms: Platform::ALL.to_vec(),
            page_load_timeout_secs: 30,
            driver_budget_secs: 60,
            action_delay: DelayRange {
                min_ms: 2_000,
                max_ms: 8_000,
            },
            typing_delay: DelayRange {
                min_ms: 50,
                max_ms: 200,
            },
            platform_delay: DelayRange {
                min_ms: 3_000,
                max_ms: 7_000,
            },
            subcommunity_delay: DelayRange {
                min_ms: 2_000,
                max_ms: 4_000,
            },
            scroll_probability: 0.6,
            pointer_probability: 0.7,
            proxy_max_failures: 3,
            proxies: Vec::new(),
            proxy_file: None,
            fingerprints_path: None,
            chrome_executable: None,
            headless: true,
            session_init_attempts: 2,
            result_limits: ResultLimits::default(),
            min_record_confidence: 0.6,
            min_topic_platforms: 2,
            min_topic_records: 3,
            max_topic_candidates: 50,
            gap_top_n: 10,
            cache_enabled: true,
            cache_dir: PathBuf::from("./data/cache"),
            cache_ttl_hours: 6,
            transcript_url: None,
            transcript_concurrency: 3,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("log_level", &self.log_level)
            .field("platforms", &self.platforms)
            .field("page_load_timeout_secs", &self.page_load_timeout_secs)
            .field("driver_budget_secs", &self.driver_budget_secs)
            .field("action_delay", &self.action_delay)
            .field("typing_delay", &self.typing_delay)
            .field("platform_delay", &self.platform_delay)
            .field("subcommunity_delay", &self.subcommunity_delay)
            .field("scroll_probability", &self.scroll_probability)
            .field("pointer_probability", &self.pointer_probability)
            .field("proxy_max_failures", &self.proxy_max_failures)
            .field(
                "proxies",
                &format_args!("[{} redacted]", self.proxies.len()),
            )
            .field("proxy_file", &self.proxy_file)
            .field("fingerprints_path", &self.fingerprints_path)
            .field("chrome_executable", &self.chrome_executable)
            .field("headless", &self.headless)
            .field("session_init_attempts", &self.session_init_attempts)
            .field("result_limits", &self.result_limits)
            .field("min_record_confidence", &self.min_record_confidence)
            .field("min_topic_platforms", &self.min_topic_platforms)
            .field("min_topic_records", &self.min_topic_records)
            .field("max_topic_candidates", &self.max_topic_candidates)
            .field("gap_top_n", &self.gap_top_n)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache_dir", &self.cache_dir)
            .field("cache_ttl_hours", &self.cache_ttl_hours)
            .field("transcript_url", &self.transcript_url)
            .field("transcript_concurrency", &self.transcript_concurrency)
            .finish()
    }
}
