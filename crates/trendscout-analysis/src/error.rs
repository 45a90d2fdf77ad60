use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("score for topic '{topic}' is not finite")]
    NonFiniteScore { topic: String },

    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache JSON error at {path}: {source}")]
    CacheJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
