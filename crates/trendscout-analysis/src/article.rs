//! Single-document input: an already-extracted article joins the topic batch
//! as a search-engine record.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use trendscout_core::{ContentRecord, PlatformMetrics};

const ARTICLE_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ArticleInput {
    /// `None` when both title and body are blank.
    #[must_use]
    pub fn into_record(self, now: DateTime<Utc>) -> Option<ContentRecord> {
        if self.title.trim().is_empty() && self.content.trim().is_empty() {
            return None;
        }
        let url = self.url.unwrap_or_default();
        let author = host_of(&url).unwrap_or("article").to_string();
        Some(ContentRecord {
            title: self.title.trim().to_string(),
            content: self.content,
            url,
            author,
            metrics: PlatformMetrics::Google { ranking: 1 },
            confidence_score: ARTICLE_CONFIDENCE,
            scraped_at: now,
        })
    }
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.rsplit_once('@').map_or(host, |(_, h)| h);
    let host = host.split(':').next()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then_some(host)
}

#[cfg(test)]
mod tests {
    use trendscout_core::Platform;

    use super::*;

    #[test]
    fn article_becomes_search_record() {
        let input: ArticleInput = serde_json::from_str(
            r#"{"title": " Passive income ideas ", "content": "Ten ideas.", "url": "https://www.example.com/post/1"}"#,
        )
        .unwrap();
        let record = input.into_record(Utc::now()).unwrap();

        assert_eq!(record.platform(), Platform::Google);
        assert_eq!(record.title, "Passive income ideas");
        assert_eq!(record.author, "example.com");
        assert!((record.confidence_score - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn url_is_optional() {
        let input: ArticleInput =
            serde_json::from_str(r#"{"title": "t", "content": "c"}"#).unwrap();
        let record = input.into_record(Utc::now()).unwrap();
        assert_eq!(record.author, "article");
        assert!(record.url.is_empty());
    }

    #[test]
    fn blank_article_is_rejected() {
        let input = ArticleInput {
            title: " ".to_string(),
            content: String::new(),
            url: None,
        };
        assert!(input.into_record(Utc::now()).is_none());
    }

    #[test]
    fn host_strips_credentials_and_port() {
        assert_eq!(host_of("http://u:p@blog.example.org:8080/x"), Some("blog.example.org"));
        assert_eq!(host_of(""), None);
    }
}
