//! Service modules for the curation pipeline
//!
//! External collaborators (arXiv search, chat completions) sit behind the
//! [`PaperSearch`] and [`CompletionService`] traits; everything else here is
//! pure pipeline logic built on top of them.

pub mod annotator;
pub mod arxiv_client;
pub mod harvester;
pub mod llm_client;
pub mod response_parser;
pub mod retry;
pub mod rubric;
pub mod views;

pub use annotator::{
    AnnotationEngine, AnnotationFailure, AnnotationOp, AnnotationOutcome, EngineConfig,
    ProgressCounter,
};
pub use arxiv_client::{ArxivClient, ArxivClientConfig, PaperSearch, SearchError, SearchStream};
pub use harvester::{harvest, merge, Harvest, MergeOutcome, MergePolicy, QueryReport, DEFAULT_QUERIES};
pub use llm_client::{CompletionRequest, CompletionService, LlmError, OpenAiClient};
pub use response_parser::{parse_classification, parse_tags};
pub use retry::RetryPolicy;
pub use views::{derive_views, write_views, DerivedViews, ViewReport};
