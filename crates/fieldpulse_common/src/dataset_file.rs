//! Reading a catalog export from disk.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fieldpulse_shared::Dataset;
use tracing::debug;

/// Load and validate a JSON dataset. Hierarchy shape is checked later, when
/// the engine is built.
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset {}", path.display()))?;
    let dataset = Dataset::from_json(&content)
        .with_context(|| format!("Failed to parse dataset {}", path.display()))?;
    dataset
        .validate()
        .with_context(|| format!("Dataset {} is inconsistent", path.display()))?;

    debug!(
        path = %path.display(),
        delegates = dataset.delegates.len(),
        visit_assignments = dataset.visit_assignments.len(),
        visit_events = dataset.visit_events.len(),
        sales_assignments = dataset.sales_assignments.len(),
        "dataset loaded"
    );
    Ok(dataset)
}
