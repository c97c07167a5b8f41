//! Test Helper Utilities
//!
//! In-memory stand-ins for the arXiv search and chat-completion services,
//! plus record builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::stream::{self, StreamExt};
use hwlit_common::PaperRecord;
use hwlit_curator::services::{
    CompletionRequest, CompletionService, EngineConfig, LlmError, PaperSearch, RetryPolicy,
    SearchError, SearchStream,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Unannotated record published on 2024-`month`-`day`
pub fn paper(id: &str, month: u32, day: u32) -> PaperRecord {
    PaperRecord::new(
        format!("http://arxiv.org/abs/{id}"),
        &format!("Paper {id}"),
        &format!("Abstract of {id}"),
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap(),
    )
}

pub fn ids(records: &[PaperRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.identifier.trim_start_matches("http://arxiv.org/abs/").to_string())
        .collect()
}

pub fn engine_config(concurrency: usize) -> EngineConfig {
    EngineConfig {
        model: "test-model".to_string(),
        concurrency,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
    }
}

// ============================================================================
// Search fake
// ============================================================================

/// Canned results per query, optionally ending in a failure
#[derive(Default)]
pub struct FakeSearch {
    results: HashMap<String, (Vec<PaperRecord>, Option<String>)>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: &str, records: Vec<PaperRecord>) -> Self {
        self.results.insert(query.to_string(), (records, None));
        self
    }

    /// Yields `records`, then a network error
    pub fn with_failing_query(mut self, query: &str, records: Vec<PaperRecord>, error: &str) -> Self {
        self.results
            .insert(query.to_string(), (records, Some(error.to_string())));
        self
    }
}

impl PaperSearch for FakeSearch {
    fn search<'a>(&'a self, query: &'a str, max_results: usize) -> SearchStream<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (records, error) = self.results.get(query).cloned().unwrap_or_default();

        let items = records.into_iter().take(max_results).map(Ok);
        let tail = error.map(|e| Err(SearchError::NetworkError(e)));
        stream::iter(items.chain(tail)).boxed()
    }
}

// ============================================================================
// LLM fake
// ============================================================================

/// Replies keyed by paper title, with failure injection and concurrency tracking
pub struct FakeLlm {
    default_reply: String,
    replies: HashMap<String, String>,
    permanent_failures: HashSet<String>,
    /// Title → transient failures still to serve before succeeding
    flaky: Mutex<HashMap<String, usize>>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeLlm {
    pub fn new(default_reply: &str) -> Self {
        Self {
            default_reply: default_reply.to_string(),
            replies: HashMap::new(),
            permanent_failures: HashSet::new(),
            flaky: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_reply(mut self, title: &str, reply: &str) -> Self {
        self.replies.insert(title.to_string(), reply.to_string());
        self
    }

    /// Every call for `title` fails with HTTP 400
    pub fn with_permanent_failure(mut self, title: &str) -> Self {
        self.permanent_failures.insert(title.to_string());
        self
    }

    /// The first `times` calls for `title` fail with HTTP 503
    pub fn with_transient_failures(self, title: &str, times: usize) -> Self {
        self.flaky.lock().unwrap().insert(title.to_string(), times);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_service(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn title_of(request: &CompletionRequest) -> String {
        request
            .user
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("Title: "))
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl CompletionService for FakeLlm {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(2)).await;

        let title = Self::title_of(request);
        let result = if self.permanent_failures.contains(&title) {
            Err(LlmError::ApiError(400, "invalid request".to_string()))
        } else {
            let mut flaky = self.flaky.lock().unwrap();
            match flaky.get_mut(&title) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    Err(LlmError::ApiError(503, "overloaded".to_string()))
                }
                _ => Ok(self
                    .replies
                    .get(&title)
                    .cloned()
                    .unwrap_or_else(|| self.default_reply.clone())),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
