//! Classify stage: label `ai_for_hw`, then write the derived views
//!
//! Selection is either field-based (records without a label, or all of them
//! with `overwrite`) or, when a baseline collection is available, every
//! record the baseline does not already contain. In baseline mode the output
//! is the baseline plus the newly labeled records.

use super::ServiceFactory;
use crate::services::annotator::{AnnotationEngine, AnnotationOp, AnnotationOutcome, EngineConfig};
use crate::services::views::write_views;
use anyhow::Context;
use hwlit_common::record::identifier_set;
use hwlit_common::{store, PaperRecord};
use std::path::PathBuf;

/// Previously labeled collection to diff against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Baseline {
    /// Field-based selection
    None,
    /// Used only if the file exists (the default baseline)
    IfExists(PathBuf),
    /// Named explicitly; a missing file is an error
    Required(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub filtered_output: PathBuf,
    /// Snapshot of the records selected for labeling
    pub unlabeled_output: PathBuf,
    pub baseline: Baseline,
    pub overwrite: bool,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records in the written output
    pub total: usize,
    pub positive: usize,
    pub filtered_written: bool,
    pub used_baseline: bool,
}

fn load_baseline(baseline: &Baseline) -> anyhow::Result<Option<Vec<PaperRecord>>> {
    match baseline {
        Baseline::None => Ok(None),
        Baseline::IfExists(path) if !path.exists() => {
            tracing::debug!(path = %path.display(), "No baseline, using field-based selection");
            Ok(None)
        }
        Baseline::IfExists(path) | Baseline::Required(path) => store::load(path)
            .map(Some)
            .with_context(|| format!("Failed to load baseline {}", path.display())),
    }
}

pub async fn run_classify(
    opts: &ClassifyOptions,
    service_factory: ServiceFactory<'_>,
) -> anyhow::Result<ClassifyReport> {
    let op = AnnotationOp::Classify;
    let records = store::load(&opts.input)
        .with_context(|| format!("Failed to load input {}", opts.input.display()))?;
    let baseline = load_baseline(&opts.baseline)?;
    let used_baseline = baseline.is_some();

    let selection: Vec<PaperRecord> = match &baseline {
        Some(labeled) => {
            tracing::info!(baseline = labeled.len(), "Diffing against labeled baseline");
            let known = identifier_set(labeled);
            records
                .iter()
                .filter(|r| !known.contains(r.identifier.as_str()))
                .cloned()
                .collect()
        }
        None => op
            .select(&records, opts.overwrite)
            .into_iter()
            .map(|i| records[i].clone())
            .collect(),
    };

    let outcome = if selection.is_empty() {
        tracing::info!("No papers to classify");
        AnnotationOutcome {
            records: baseline.unwrap_or(records),
            selected: 0,
            succeeded: 0,
            failures: Vec::new(),
        }
    } else {
        let service = service_factory()?;

        tracing::info!(
            selected = selection.len(),
            path = %opts.unlabeled_output.display(),
            "Saving selection snapshot"
        );
        if let Err(e) = store::save(&opts.unlabeled_output, &selection) {
            tracing::warn!(error = %e, "Failed to write selection snapshot");
        }

        let engine = AnnotationEngine::new(service, opts.engine.clone());
        match baseline {
            Some(labeled) => engine.annotate_against_baseline(records, labeled, op).await,
            None => engine.annotate(records, op, opts.overwrite).await,
        }
    };

    let views = write_views(&opts.output, &opts.filtered_output, &outcome.records)
        .with_context(|| format!("Failed to write {}", opts.output.display()))?;

    tracing::info!(
        total = views.total,
        positive = views.positive,
        path = %opts.output.display(),
        "Classification complete"
    );

    Ok(ClassifyReport {
        selected: outcome.selected,
        succeeded: outcome.succeeded,
        failed: outcome.failed(),
        total: views.total,
        positive: views.positive,
        filtered_written: views.filtered_written,
        used_baseline,
    })
}
