//! Pipeline stages
//!
//! Each stage loads its collections through the record store, runs the
//! relevant service, and persists the result atomically:
//! - **harvest**: search, deduplicate, merge into the persisted collection
//! - **classify**: label `ai_for_hw`, write the sorted and positive views
//! - **tag**: assign subtopic tags to positive papers, resuming prior output
//! - **sort**: re-sort a collection by publication date in place
//!
//! Stages that call the LLM take a service factory instead of a client so
//! that credentials are only required once there is work to do.

pub mod classify;
pub mod harvest;
pub mod sort;
pub mod tag;

pub use classify::{run_classify, Baseline, ClassifyOptions, ClassifyReport};
pub use harvest::{run_harvest, HarvestOptions, HarvestReport};
pub use sort::run_sort;
pub use tag::{run_tag, TagOptions, TagReport};

use crate::services::CompletionService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds the LLM client on first need
pub type ServiceFactory<'a> = &'a (dyn Fn() -> anyhow::Result<Arc<dyn CompletionService>> + Send + Sync);

const HARVEST_FILE: &str = "llm_hw_design_papers.json";
const LABELED_SUFFIX: &str = "_labeled";
const UNLABELED_SUFFIX: &str = "_unlabeled";
const FILTERED_FILE: &str = "filter_papers.json";
const TAGGED_FILE: &str = "tagged_papers.json";

/// Default collection locations under the data directory
#[derive(Debug, Clone)]
pub struct DataPaths {
    data_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Harvest output and classify input
    pub fn harvested(&self) -> PathBuf {
        self.data_dir.join(HARVEST_FILE)
    }

    /// Classification baseline from a previous run
    pub fn labeled_baseline(&self) -> PathBuf {
        labeled_path(&self.harvested())
    }

    /// Tag input; also the default `sort` target
    pub fn filtered(&self) -> PathBuf {
        self.data_dir.join(FILTERED_FILE)
    }

    pub fn tagged(&self) -> PathBuf {
        self.data_dir.join(TAGGED_FILE)
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `<stem>_labeled.json` next to `input`; an already-suffixed input maps to itself
pub fn labeled_path(input: &Path) -> PathBuf {
    let stem = stem(input);
    if stem.ends_with(LABELED_SUFFIX) {
        return input.to_path_buf();
    }
    input.with_file_name(format!("{stem}{LABELED_SUFFIX}.json"))
}

/// `<input stem>_unlabeled.json` in the directory of `output`
pub fn unlabeled_path(input: &Path, output: &Path) -> PathBuf {
    dir_of(output).join(format!("{}{UNLABELED_SUFFIX}.json", stem(input)))
}

/// `filter_papers.json` in the directory of `output`
pub fn filtered_path(output: &Path) -> PathBuf {
    dir_of(output).join(FILTERED_FILE)
}
