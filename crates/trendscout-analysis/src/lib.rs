//! Aggregation layer: turns scraped records into ranked trending topics,
//! content gaps and influencer leads.

mod article;
mod cache;
mod error;
mod gaps;
mod influencers;
mod keywords;
mod scorer;
mod taxonomy;
mod topics;

pub use article::ArticleInput;
pub use cache::{cache_key, CacheFile, TrendCache};
pub use error::AnalysisError;
pub use gaps::{identify_content_gaps, suggested_content_types, ContentGap, GapType};
pub use influencers::{
    analyze_influencers, collaboration_potential, follower_estimate, InfluencerProfile,
    PostingFrequency, DEFAULT_INFLUENCER_LIMIT,
};
pub use keywords::{contains_phrase, ngram_counts, record_keywords};
pub use scorer::{mean_polarity, polarity};
pub use taxonomy::{market_opportunity, Category};
pub use topics::{
    growth_rate, momentum, prediction_score, quality_filter, GrowthIndicators, TopicCandidate,
    TopicExtractor, TopicSettings, TrendingTopic, MAX_CONTENT_SAMPLES,
};
