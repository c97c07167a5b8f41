//! Concurrent annotation engine
//!
//! Applies one [`AnnotationOp`] to every record that needs it:
//! - selection is field-based (or baseline-based for classification)
//! - selected records are processed by a bounded pool of workers via
//!   `futures::stream::buffer_unordered(width)`, each worker owning exactly
//!   one record at a time
//! - every LLM call is retried on transient errors with a linear backoff
//! - a record that still fails is marked (tagging) or left unlabeled
//!   (classification) and the batch carries on
//!
//! The only state shared between workers is the [`ProgressCounter`].

use crate::services::llm_client::{CompletionRequest, CompletionService, LlmError};
use crate::services::response_parser::{parse_classification, parse_tags};
use crate::services::retry::RetryPolicy;
use crate::services::rubric::{classification_request, tagging_request};
use futures::stream::{self, StreamExt};
use hwlit_common::record::identifier_set;
use hwlit_common::{PaperRecord, Tag};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default worker pool width
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Progress log interval
const PROGRESS_EVERY: usize = 10;

/// Annotation applied by one engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationOp {
    /// Sets `ai_for_hw`
    Classify,
    /// Sets `tags`
    Tag,
}

impl AnnotationOp {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationOp::Classify => "classify",
            AnnotationOp::Tag => "tag",
        }
    }

    /// True when the target field is missing
    pub fn needs(&self, record: &PaperRecord) -> bool {
        match self {
            AnnotationOp::Classify => record.ai_for_hw.is_none(),
            AnnotationOp::Tag => record.needs_tags(),
        }
    }

    /// Indices of records to process
    pub fn select(&self, records: &[PaperRecord], force: bool) -> Vec<usize> {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| force || self.needs(r))
            .map(|(i, _)| i)
            .collect()
    }

    fn request(&self, model: &str, record: &PaperRecord) -> CompletionRequest {
        match self {
            AnnotationOp::Classify => classification_request(model, &record.title, &record.summary),
            AnnotationOp::Tag => tagging_request(model, &record.title, &record.summary),
        }
    }

    fn apply(&self, record: &mut PaperRecord, response: &str) {
        match self {
            AnnotationOp::Classify => record.ai_for_hw = Some(parse_classification(response)),
            AnnotationOp::Tag => record.tags = Some(parse_tags(response)),
        }
    }

    fn mark_failed(&self, record: &mut PaperRecord) {
        match self {
            // A forced re-run keeps nothing from the stale label
            AnnotationOp::Classify => record.ai_for_hw = None,
            AnnotationOp::Tag => record.tags = Some(vec![Tag::Error]),
        }
    }
}

/// Thread-safe count of records fully resolved in the current run
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter(Arc<AtomicUsize>);

impl ProgressCounter {
    pub fn completed(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

/// Record whose annotation failed permanently
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationFailure {
    pub identifier: String,
    pub error: String,
}

/// Result of one engine run
#[derive(Debug, Clone)]
pub struct AnnotationOutcome {
    /// Full collection, processed records updated in place
    pub records: Vec<PaperRecord>,
    pub selected: usize,
    pub succeeded: usize,
    pub failures: Vec<AnnotationFailure>,
}

impl AnnotationOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Concurrent annotation engine
pub struct AnnotationEngine {
    service: Arc<dyn CompletionService>,
    config: EngineConfig,
    progress: ProgressCounter,
}

impl AnnotationEngine {
    pub fn new(service: Arc<dyn CompletionService>, config: EngineConfig) -> Self {
        Self {
            service,
            config,
            progress: ProgressCounter::default(),
        }
    }

    /// Handle for observing progress while a run is in flight
    pub fn progress(&self) -> ProgressCounter {
        self.progress.clone()
    }

    /// Annotate records whose target field is missing (all of them if `force`)
    pub async fn annotate(
        &self,
        records: Vec<PaperRecord>,
        op: AnnotationOp,
        force: bool,
    ) -> AnnotationOutcome {
        let selected = op.select(&records, force);
        self.run(records, selected, op).await
    }

    /// Annotate records missing from `baseline`
    ///
    /// Selection ignores the existing field values. The result is the
    /// baseline followed by the newly processed records.
    pub async fn annotate_against_baseline(
        &self,
        records: Vec<PaperRecord>,
        baseline: Vec<PaperRecord>,
        op: AnnotationOp,
    ) -> AnnotationOutcome {
        let fresh: Vec<PaperRecord> = {
            let known = identifier_set(&baseline);
            records
                .into_iter()
                .filter(|r| !known.contains(r.identifier.as_str()))
                .collect()
        };

        let all: Vec<usize> = (0..fresh.len()).collect();
        let processed = self.run(fresh, all, op).await;

        let mut combined = baseline;
        combined.extend(processed.records);
        AnnotationOutcome {
            records: combined,
            ..processed
        }
    }

    async fn run(
        &self,
        records: Vec<PaperRecord>,
        selected: Vec<usize>,
        op: AnnotationOp,
    ) -> AnnotationOutcome {
        let total = selected.len();
        self.progress.reset();

        if total == 0 {
            tracing::info!(op = op.name(), "No papers to process");
            return AnnotationOutcome {
                records,
                selected: 0,
                succeeded: 0,
                failures: Vec::new(),
            };
        }

        let width = self.config.concurrency.max(1);
        tracing::info!(
            op = op.name(),
            selected = total,
            workers = width,
            "Processing papers with concurrent workers"
        );

        // Selected records move into the workers and come back by index
        let mut slots: Vec<Option<PaperRecord>> = records.into_iter().map(Some).collect();
        let work: Vec<(usize, PaperRecord)> = selected
            .into_iter()
            .filter_map(|i| slots[i].take().map(|r| (i, r)))
            .collect();

        let results: Vec<(usize, PaperRecord, Option<AnnotationFailure>)> = stream::iter(work)
            .map(|(index, record)| self.process_one(index, record, op, total))
            .buffer_unordered(width)
            .collect()
            .await;

        let mut failures = Vec::new();
        for (index, record, failure) in results {
            failures.extend(failure);
            slots[index] = Some(record);
        }
        let succeeded = total - failures.len();

        tracing::info!(
            op = op.name(),
            succeeded,
            failed = failures.len(),
            "Annotation batch finished"
        );

        AnnotationOutcome {
            records: slots.into_iter().flatten().collect(),
            selected: total,
            succeeded,
            failures,
        }
    }

    async fn process_one(
        &self,
        index: usize,
        mut record: PaperRecord,
        op: AnnotationOp,
        total: usize,
    ) -> (usize, PaperRecord, Option<AnnotationFailure>) {
        let request = op.request(&self.config.model, &record);

        let failure = match self.complete_with_retry(&request).await {
            Ok(response) => {
                op.apply(&mut record, &response);
                None
            }
            Err(e) => {
                tracing::warn!(
                    op = op.name(),
                    title = %record.title,
                    error = %e,
                    "Annotation failed, skipping"
                );
                op.mark_failed(&mut record);
                Some(AnnotationFailure {
                    identifier: record.identifier.clone(),
                    error: e.to_string(),
                })
            }
        };

        let current = self.progress.increment();
        if current % PROGRESS_EVERY == 0 || current == total {
            tracing::info!(
                op = op.name(),
                progress = format!("{}/{}", current, total),
                "Annotation progress"
            );
        }

        (index, record, failure)
    }

    async fn complete_with_retry(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.config
            .retry
            .run(LlmError::is_transient, || self.service.complete(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::services::retry::MAX_ATTEMPTS;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::time::Duration;

    fn paper(id: &str) -> PaperRecord {
        PaperRecord::new(id, id, "abstract", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn config() -> EngineConfig {
        EngineConfig {
            model: "test-model".to_string(),
            concurrency: 4,
            retry: RetryPolicy {
                max_attempts: MAX_ATTEMPTS,
                base_delay: Duration::from_millis(1),
            },
        }
    }

    /// Replays a fixed script of responses regardless of prompt
    struct Scripted {
        replies: Mutex<Vec<Result<String, LlmError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<String, LlmError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("true".to_string()))
        }
    }

    #[test]
    fn test_select_field_based() {
        let mut labeled = paper("a");
        labeled.ai_for_hw = Some(false);
        let records = vec![labeled, paper("b")];

        assert_eq!(AnnotationOp::Classify.select(&records, false), vec![1]);
        assert_eq!(AnnotationOp::Classify.select(&records, true), vec![0, 1]);
    }

    #[test]
    fn test_select_tags_retries_error_sentinel() {
        let mut tagged = paper("a");
        tagged.tags = Some(vec![Tag::Security]);
        let mut errored = paper("b");
        errored.tags = Some(vec![Tag::Error]);
        let records = vec![tagged, errored, paper("c")];

        assert_eq!(AnnotationOp::Tag.select(&records, false), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let service = Arc::new(Scripted::new(vec![
            Err(LlmError::RateLimited),
            Err(LlmError::ApiError(502, "bad gateway".into())),
            Ok("True.".to_string()),
        ]));
        let engine = AnnotationEngine::new(service.clone(), config());

        let outcome = engine.annotate(vec![paper("a")], AnnotationOp::Classify, false).await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.records[0].ai_for_hw, Some(true));
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let service = Arc::new(Scripted::new(vec![
            Err(LlmError::NetworkError("reset".into())),
            Err(LlmError::NetworkError("reset".into())),
            Err(LlmError::NetworkError("reset".into())),
            Ok("true".to_string()),
        ]));
        let engine = AnnotationEngine::new(service.clone(), config());

        let outcome = engine.annotate(vec![paper("a")], AnnotationOp::Tag, false).await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].identifier, "a");
        assert_eq!(outcome.records[0].tags, Some(vec![Tag::Error]));
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let service = Arc::new(Scripted::new(vec![Err(LlmError::ApiError(401, "bad key".into()))]));
        let engine = AnnotationEngine::new(service.clone(), config());

        let outcome = engine.annotate(vec![paper("a")], AnnotationOp::Classify, false).await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.failed(), 1);
        assert!(outcome.failures[0].error.contains("401"));
        assert_eq!(outcome.records[0].ai_for_hw, None);
    }

    #[tokio::test]
    async fn test_empty_selection_skips_service() {
        let service = Arc::new(Scripted::new(vec![]));
        let engine = AnnotationEngine::new(service.clone(), config());
        let mut done = paper("a");
        done.ai_for_hw = Some(true);

        let outcome = engine.annotate(vec![done.clone()], AnnotationOp::Classify, false).await;

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.selected, 0);
        assert_eq!(outcome.records, vec![done]);
    }
}
