//! Tag stage: assign subtopic tags to positive papers
//!
//! Unless `overwrite` is set, the existing output is the starting point:
//! input records it does not contain are appended, and only records without
//! usable tags are sent to the LLM. The result is saved newest first.

use super::ServiceFactory;
use crate::services::annotator::{AnnotationEngine, AnnotationOp, EngineConfig};
use anyhow::Context;
use hwlit_common::record::{identifier_set, sort_newest_first};
use hwlit_common::store;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct TagOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub overwrite: bool,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagReport {
    /// Records carried over from the previous output
    pub resumed: usize,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

pub async fn run_tag(opts: &TagOptions, service_factory: ServiceFactory<'_>) -> anyhow::Result<TagReport> {
    let op = AnnotationOp::Tag;
    let input = store::load(&opts.input)
        .with_context(|| format!("Failed to load input {}", opts.input.display()))?;

    let (combined, resumed) = if opts.overwrite {
        tracing::warn!(count = input.len(), "Overwrite set, re-tagging every input paper");
        (input, 0)
    } else {
        let mut existing = store::load_or_empty(&opts.output).unwrap_or_else(|e| {
            tracing::warn!(
                path = %opts.output.display(),
                error = %e,
                "Could not read existing output, starting over"
            );
            Vec::new()
        });
        let resumed = existing.len();
        let fresh: Vec<_> = {
            let known = identifier_set(&existing);
            input
                .into_iter()
                .filter(|r| !known.contains(r.identifier.as_str()))
                .collect()
        };
        existing.extend(fresh);
        (existing, resumed)
    };

    let selected = op.select(&combined, opts.overwrite).len();
    let (mut records, succeeded, failed) = if selected == 0 {
        tracing::info!("No new papers to tag");
        (combined, 0, 0)
    } else {
        let service = service_factory()?;
        let engine = AnnotationEngine::new(service, opts.engine.clone());
        let outcome = engine.annotate(combined, op, opts.overwrite).await;
        let failed = outcome.failed();
        (outcome.records, outcome.succeeded, failed)
    };

    sort_newest_first(&mut records);
    store::save(&opts.output, &records)
        .with_context(|| format!("Failed to save {}", opts.output.display()))?;

    tracing::info!(
        tagged = succeeded,
        failed,
        total = records.len(),
        path = %opts.output.display(),
        "Tagging complete"
    );

    Ok(TagReport {
        resumed,
        selected,
        succeeded,
        failed,
        total: records.len(),
    })
}
