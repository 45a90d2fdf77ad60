//! Anti-detection browser session layer.
//!
//! Holds the identity pool (egress proxies and device fingerprints), the
//! stealth session factory with its behavior simulator, and the cancellable
//! pacing used everywhere a crawl waits.

mod behavior;
mod chromium;
mod error;
mod fingerprint;
mod pacer;
mod page;
mod pool;
mod proxy;
pub mod scripted;
pub mod selector;
mod session;
mod stealth;

pub use behavior::{BehaviorSettings, BehaviorSimulator, Gesture};
pub use chromium::{find_chrome_executable, ChromiumSessionFactory};
pub use error::SessionError;
pub use fingerprint::{default_fingerprints, load_fingerprints, Fingerprint, ViewportSize};
pub use pacer::{InstantPacer, JitterPacer, Pacer, Pacing};
pub use page::BrowserPage;
pub use pool::{Identity, IdentityPool, IdentityRecord, PoolStats, ProxyId, ProxyLease};
pub use proxy::{load_proxy_file, parse_proxies, ProxyEndpoint, ProxyScheme};
pub use session::{SelectorMatch, SessionFactory, StealthSession};
pub use stealth::stealth_script;

pub use tokio_util::sync::CancellationToken;
