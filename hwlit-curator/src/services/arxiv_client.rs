//! arXiv search client
//!
//! Pages through the arXiv Atom API newest-first and yields one
//! [`PaperRecord`] per entry as a lazy stream. Pagination is rate limited to
//! one request every three seconds per the arXiv API terms.
//!
//! Stream semantics:
//! - an empty page is the natural end of results, not an error
//! - a page that fails transiently (network, 429, 5xx) is re-requested under
//!   the client's [`RetryPolicy`]
//! - any other error, or one that outlives its retries, is yielded once and
//!   ends the stream; records already yielded stay valid

use crate::services::retry::RetryPolicy;
use futures::stream::BoxStream;
use governor::{Quota, RateLimiter};
use hwlit_common::time::parse_published;
use hwlit_common::PaperRecord;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const ARXIV_BASE_URL: &str = "http://export.arxiv.org/api/query";
const USER_AGENT: &str = concat!("hwlit-curator/", env!("CARGO_PKG_VERSION"));
const PAGE_SIZE: usize = 100;
const PAGE_INTERVAL: Duration = Duration::from_secs(3);

/// Search client errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl SearchError {
    /// Whether re-requesting the same page may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::NetworkError(_) => true,
            SearchError::ApiError(status, _) => *status == 429 || *status >= 500,
            SearchError::ParseError(_) | SearchError::InvalidConfig(_) => false,
        }
    }
}

/// Lazy, finite, non-restartable result sequence
pub type SearchStream<'a> = BoxStream<'a, Result<PaperRecord, SearchError>>;

/// Literature search capability
pub trait PaperSearch: Send + Sync {
    /// Results for `query`, newest first, at most `max_results` items
    fn search<'a>(&'a self, query: &'a str, max_results: usize) -> SearchStream<'a>;
}

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Endpoint, paging and pacing settings for [`ArxivClient`]
#[derive(Debug, Clone)]
pub struct ArxivClientConfig {
    pub base_url: String,
    pub page_size: usize,
    /// Minimum spacing between page requests
    pub page_interval: Duration,
    pub retry: RetryPolicy,
}

impl Default for ArxivClientConfig {
    fn default() -> Self {
        Self {
            base_url: ARXIV_BASE_URL.to_string(),
            page_size: PAGE_SIZE,
            page_interval: PAGE_INTERVAL,
            retry: RetryPolicy::default(),
        }
    }
}

/// arXiv Atom API client
pub struct ArxivClient {
    http_client: reqwest::Client,
    base_url: String,
    page_size: usize,
    retry: RetryPolicy,
    rate_limiter: DirectRateLimiter,
}

impl ArxivClient {
    pub fn new() -> Result<Self, SearchError> {
        Self::with_config(ArxivClientConfig::default())
    }

    pub fn with_config(config: ArxivClientConfig) -> Result<Self, SearchError> {
        if config.page_size == 0 {
            return Err(SearchError::InvalidConfig("page size must be positive".to_string()));
        }
        let quota = Quota::with_period(config.page_interval).ok_or_else(|| {
            SearchError::InvalidConfig("page interval must be non-zero".to_string())
        })?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url,
            page_size: config.page_size,
            retry: config.retry,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    async fn fetch_page(
        &self,
        query: &str,
        start: usize,
        page_len: usize,
    ) -> Result<Vec<PaperRecord>, SearchError> {
        self.rate_limiter.until_ready().await;

        let start_param = start.to_string();
        let len_param = page_len.to_string();
        let params = [
            ("search_query", query),
            ("start", start_param.as_str()),
            ("max_results", len_param.as_str()),
            ("sortBy", "submittedDate"),
            ("sortOrder", "descending"),
        ];

        tracing::debug!(query = %query, start, page_len, "Querying arXiv API");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::NetworkError(e.to_string()))?;

        parse_feed(&body)
    }
}

impl PaperSearch for ArxivClient {
    fn search<'a>(&'a self, query: &'a str, max_results: usize) -> SearchStream<'a> {
        Box::pin(async_stream::stream! {
            let mut start = 0;
            while start < max_results {
                let page_len = self.page_size.min(max_results - start);
                let fetched = self
                    .retry
                    .run(SearchError::is_transient, || self.fetch_page(query, start, page_len))
                    .await;
                let page = match fetched {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::warn!(query = %query, start, error = %e, "Giving up on arXiv page");
                        yield Err(e);
                        break;
                    }
                };
                if page.is_empty() {
                    tracing::debug!(query = %query, start, "Empty page, results exhausted");
                    break;
                }
                start += page.len();
                for record in page {
                    yield Ok(record);
                }
            }
        })
    }
}

// ============================================================================
// Atom feed decoding
// ============================================================================

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
}

/// Decode one Atom page into records
///
/// arXiv reports query errors as a feed with a single entry whose id points
/// at `/api/errors`; that is surfaced as an API error.
pub fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>, SearchError> {
    let feed: AtomFeed =
        quick_xml::de::from_str(xml).map_err(|e| SearchError::ParseError(e.to_string()))?;

    feed.entries.into_iter().map(entry_to_record).collect()
}

fn entry_to_record(entry: AtomEntry) -> Result<PaperRecord, SearchError> {
    let identifier = entry.id.trim();
    if identifier.contains("/api/errors") {
        return Err(SearchError::ApiError(400, entry.summary.trim().to_string()));
    }

    let published = parse_published(&entry.published).ok_or_else(|| {
        SearchError::ParseError(format!(
            "entry {} has invalid published date '{}'",
            identifier, entry.published
        ))
    })?;

    Ok(PaperRecord::new(identifier, &entry.title, &entry.summary, published))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/abc</id>
  <updated>2024-03-02T00:00:00-05:00</updated>
  <opensearch:totalResults xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">2</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/2403.00002v1</id>
    <updated>2024-03-01T10:00:00Z</updated>
    <published>2024-03-01T10:00:00Z</published>
    <title>LLM-Driven Verilog
  Generation</title>
    <summary>We generate RTL.
With language models.
</summary>
    <author><name>A. Author</name></author>
    <author><name>B. Author</name></author>
    <link href="http://arxiv.org/abs/2403.00002v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2403.00002v1" rel="related" type="application/pdf"/>
    <category term="cs.AR" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2402.00001v2</id>
    <updated>2024-02-01T10:00:00Z</updated>
    <published>2024-02-01T09:30:15Z</published>
    <title>Placement with RL</title>
    <summary>Reinforcement learning for placement.</summary>
    <author><name>C. Author</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entries() {
        let records = parse_feed(FEED).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].identifier, "http://arxiv.org/abs/2403.00002v1");
        assert_eq!(records[0].summary, "We generate RTL. With language models.");
        assert!(records[0].title.starts_with("LLM-Driven Verilog"));
        assert_eq!(
            hwlit_common::time::format_published(&records[1].published),
            "2024-02-01T09:30:15Z"
        );
        assert_eq!(records[1].ai_for_hw, None);
    }

    #[test]
    fn test_parse_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>ArXiv Query</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_entry() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
    <title>Error</title>
    <summary>incorrect id format for 1234</summary>
    <updated>2024-03-01T00:00:00-05:00</updated>
  </entry>
</feed>"#;
        match parse_feed(xml) {
            Err(SearchError::ApiError(400, msg)) => assert!(msg.contains("incorrect id format")),
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_xml() {
        assert!(matches!(
            parse_feed("<feed><entry>"),
            Err(SearchError::ParseError(_))
        ));
    }

    #[test]
    fn test_client_creation() {
        assert!(ArxivClient::new().is_ok());
    }

    #[test]
    fn test_zero_page_interval_is_rejected() {
        let config = ArxivClientConfig {
            page_interval: Duration::ZERO,
            ..ArxivClientConfig::default()
        };
        assert!(matches!(
            ArxivClient::with_config(config),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let config = ArxivClientConfig {
            page_size: 0,
            ..ArxivClientConfig::default()
        };
        assert!(matches!(
            ArxivClient::with_config(config),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_transient_search_errors() {
        assert!(SearchError::NetworkError("reset".into()).is_transient());
        assert!(SearchError::ApiError(429, String::new()).is_transient());
        assert!(SearchError::ApiError(503, String::new()).is_transient());
        assert!(!SearchError::ApiError(400, String::new()).is_transient());
        assert!(!SearchError::ParseError("bad xml".into()).is_transient());
    }
}
