//! Harvest stage: search, deduplicate, merge, persist

use crate::services::harvester::{harvest, merge, MergeOutcome, MergePolicy, QueryReport};
use crate::services::PaperSearch;
use anyhow::Context;
use hwlit_common::store;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub output: PathBuf,
    pub queries: Vec<String>,
    pub max_results: usize,
    pub policy: MergePolicy,
}

#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Unique records across all queries
    pub harvested: usize,
    /// Records not present in the persisted collection
    pub added: usize,
    /// Size of the persisted collection after the run
    pub total: usize,
    /// False when an incremental run found nothing new
    pub written: bool,
    pub queries: Vec<QueryReport>,
}

pub async fn run_harvest(search: &dyn PaperSearch, opts: &HarvestOptions) -> anyhow::Result<HarvestReport> {
    // An unreadable collection must stop an incremental run before it is overwritten
    let persisted = match opts.policy {
        MergePolicy::Incremental => store::load_or_empty(&opts.output)
            .with_context(|| format!("Failed to load existing collection {}", opts.output.display()))?,
        MergePolicy::FullRebuild => store::load_or_empty(&opts.output).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Existing collection unreadable, rebuilding from scratch");
            Vec::new()
        }),
    };
    let persisted_len = persisted.len();

    let harvest = harvest(search, &opts.queries, opts.max_results).await;
    let harvested = harvest.records.len();

    match merge(harvest.records, persisted, opts.policy) {
        MergeOutcome::Changed { records, added } => {
            store::save(&opts.output, &records)
                .with_context(|| format!("Failed to save {}", opts.output.display()))?;
            tracing::info!(
                added,
                total = records.len(),
                path = %opts.output.display(),
                "Collection updated"
            );
            Ok(HarvestReport {
                harvested,
                added,
                total: records.len(),
                written: true,
                queries: harvest.queries,
            })
        }
        MergeOutcome::Unchanged => {
            tracing::info!(path = %opts.output.display(), "No new papers, collection left untouched");
            Ok(HarvestReport {
                harvested,
                added: 0,
                total: persisted_len,
                written: false,
                queries: harvest.queries,
            })
        }
    }
}
