//! Sort stage: reorder a collection newest first, in place

use anyhow::Context;
use hwlit_common::record::sort_newest_first;
use hwlit_common::store;
use std::path::Path;

/// Returns the number of records written
pub fn run_sort(path: &Path) -> anyhow::Result<usize> {
    let mut records =
        store::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    sort_newest_first(&mut records);
    store::save(path, &records).with_context(|| format!("Failed to save {}", path.display()))?;

    tracing::info!(count = records.len(), path = %path.display(), "Sorted by publication date");
    Ok(records.len())
}
