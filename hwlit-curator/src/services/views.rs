//! Derived views of an annotated collection
//!
//! The sorted full collection is the authoritative output of the classify
//! stage; the positive-only subset is a convenience artifact.

use hwlit_common::record::sort_newest_first;
use hwlit_common::{store, PaperRecord};
use std::path::Path;

/// Sorted full collection and its positive subsequence
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedViews {
    pub sorted: Vec<PaperRecord>,
    pub positive: Vec<PaperRecord>,
}

/// Outcome of writing both views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewReport {
    pub total: usize,
    pub positive: usize,
    /// False when there were no positives or the best-effort write failed
    pub filtered_written: bool,
}

/// Build both views without touching the input
pub fn derive_views(records: &[PaperRecord]) -> DerivedViews {
    let mut sorted = records.to_vec();
    sort_newest_first(&mut sorted);
    let positive = sorted.iter().filter(|r| r.is_positive()).cloned().collect();
    DerivedViews { sorted, positive }
}

/// Write the sorted view to `primary` and, if non-empty, the positive view to `filtered`
///
/// Only the primary write can fail the call.
pub fn write_views(
    primary: &Path,
    filtered: &Path,
    records: &[PaperRecord],
) -> hwlit_common::Result<ViewReport> {
    let views = derive_views(records);
    store::save(primary, &views.sorted)?;

    let mut report = ViewReport {
        total: views.sorted.len(),
        positive: views.positive.len(),
        filtered_written: false,
    };

    if views.positive.is_empty() {
        tracing::info!("No positive papers, skipping filtered view");
        return Ok(report);
    }

    match store::save(filtered, &views.positive) {
        Ok(()) => report.filtered_written = true,
        Err(e) => tracing::warn!(
            path = %filtered.display(),
            error = %e,
            "Failed to write filtered view"
        ),
    }

    Ok(report)
}
