//! Video transcript collaborator.
//!
//! Transcripts come from an external service. Any failure is treated as "no
//! transcript": the record keeps its description, or is dropped if it has none.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use trendscout_core::{ContentRecord, Platform};

/// Where a transcript's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Captions,
    AutoGenerated,
    AudioTranscription,
    DescriptionFallback,
}

impl TranscriptSource {
    /// Confidence assumed when the service does not report one.
    #[must_use]
    pub fn default_confidence(self) -> f64 {
        match self {
            Self::Captions => 0.95,
            Self::AutoGenerated => 0.80,
            Self::AudioTranscription => 0.70,
            Self::DescriptionFallback => 0.30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub source: TranscriptSource,
}

impl Transcript {
    /// Reported confidence, or the source's default, clamped to `[0, 1]`.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.confidence_score
            .unwrap_or_else(|| self.source.default_confidence())
            .clamp(0.0, 1.0)
    }
}

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no transcript available for {video_id}")]
    NotAvailable { video_id: String },

    #[error("unexpected HTTP status {status} for {video_id}")]
    UnexpectedStatus { status: u16, video_id: String },

    #[error("transcript for {video_id} is empty")]
    Empty { video_id: String },
}

/// `extract_transcript(video_id) -> Transcript`.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// # Errors
    ///
    /// Any [`TranscriptError`]; callers treat every error as "no transcript".
    async fn extract_transcript(&self, video_id: &str) -> Result<Transcript, TranscriptError>;
}

/// Client for a transcript service exposing `GET {base}/transcripts/{video_id}`.
#[derive(Debug, Clone)]
pub struct HttpTranscriptService {
    client: Client,
    base_url: String,
}

impl HttpTranscriptService {
    /// # Errors
    ///
    /// Returns [`TranscriptError::Http`] if the client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TranscriptError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("trendscout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TranscriptService for HttpTranscriptService {
    async fn extract_transcript(&self, video_id: &str) -> Result<Transcript, TranscriptError> {
        let url = format!(
            "{}/transcripts/{}",
            self.base_url,
            utf8_percent_encode(video_id, NON_ALPHANUMERIC)
        );
        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(TranscriptError::NotAvailable {
                    video_id: video_id.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(TranscriptError::UnexpectedStatus {
                    status: status.as_u16(),
                    video_id: video_id.to_string(),
                })
            }
            _ => {}
        }
        let transcript: Transcript = response.json().await?;
        if transcript.text.trim().is_empty() {
            return Err(TranscriptError::Empty {
                video_id: video_id.to_string(),
            });
        }
        Ok(transcript)
    }
}

/// Video id from a watch, short-link, or shorts URL.
#[must_use]
pub fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(ToString::to_string),
        "youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts" | "embed" | "live") => segments.next().map(ToString::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;
    (!id.is_empty()).then_some(id)
}

/// Fetch transcripts for `video_ids` with at most `concurrency` in flight.
///
/// Results line up with the input; failures become `None`.
pub async fn batch_extract(
    service: Arc<dyn TranscriptService>,
    video_ids: &[String],
    concurrency: usize,
) -> Vec<Option<Transcript>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let tasks = video_ids.iter().map(|video_id| {
        let semaphore = Arc::clone(&semaphore);
        let service = Arc::clone(&service);
        async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return None;
            };
            match service.extract_transcript(video_id).await {
                Ok(transcript) => Some(transcript),
                Err(e) => {
                    tracing::warn!(video_id = %video_id, error = %e, "transcript unavailable");
                    None
                }
            }
        }
    });
    join_all(tasks).await
}

/// Attach transcripts to video records.
///
/// A record with a transcript gets its text appended to the description. A
/// record without one keeps the description, or is dropped when that is
/// empty. Other platforms pass through untouched; order is preserved.
pub async fn enrich_video_records(
    service: Arc<dyn TranscriptService>,
    records: Vec<ContentRecord>,
    concurrency: usize,
) -> Vec<ContentRecord> {
    let targets: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.platform() == Platform::YouTube)
        .filter_map(|(i, r)| video_id_from_url(&r.url).map(|id| (i, id)))
        .collect();
    let ids: Vec<String> = targets.iter().map(|(_, id)| id.clone()).collect();
    let transcripts = batch_extract(service, &ids, concurrency).await;

    let mut by_index: Vec<Option<Transcript>> = vec![None; records.len()];
    for ((i, _), transcript) in targets.into_iter().zip(transcripts) {
        by_index[i] = transcript;
    }

    let before = records.len();
    let enriched: Vec<ContentRecord> = records
        .into_iter()
        .zip(by_index)
        .filter_map(|(mut record, transcript)| {
            if record.platform() != Platform::YouTube {
                return Some(record);
            }
            match transcript {
                Some(t) => {
                    record.content = if record.content.trim().is_empty() {
                        t.text
                    } else {
                        format!("{}\n\n{}", record.content, t.text)
                    };
                    Some(record)
                }
                None if record.content.trim().is_empty() => None,
                None => Some(record),
            }
        })
        .collect();
    if enriched.len() < before {
        tracing::info!(
            dropped = before - enriched.len(),
            "video records without transcript or description dropped"
        );
    }
    enriched
}
