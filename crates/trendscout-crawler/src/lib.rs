//! Platform drivers, the sequential crawl orchestrator, and the transcript
//! collaborator boundary.

mod block;
mod driver;
pub mod drivers;
mod error;
mod orchestrator;
mod retry;
pub mod transcript;

pub use block::detect_block;
pub use driver::{run_driver, DriverContext, DriverState, PlatformDriver, SearchPass};
pub use drivers::{
    configured_drivers, driver_for, GoogleDriver, RedditDriver, TwitterDriver, YouTubeDriver,
};
pub use error::{CrawlError, PlatformSearchError};
pub use orchestrator::{CrawlBatch, CrawlOrchestrator, PlatformOutcome};
pub use transcript::{
    enrich_video_records, HttpTranscriptService, Transcript, TranscriptError, TranscriptService,
    TranscriptSource,
};
