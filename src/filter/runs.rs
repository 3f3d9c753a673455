//! Splitting a dataset into its sequencing runs.

use crate::data::Dataset;
use crate::error::{MetabarError, Result};
use indexmap::IndexMap;

/// Sub-datasets keyed by run identifier, in first-seen order.
///
/// Every record of the source dataset belongs to exactly one run.
#[derive(Debug, Clone)]
pub struct RunPartition {
    runs: IndexMap<String, Dataset>,
}

impl RunPartition {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&Dataset> {
        self.runs.get(run_id)
    }

    pub fn run_ids(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.runs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total records over all runs.
    pub fn n_records(&self) -> usize {
        self.runs.values().map(|d| d.len()).sum()
    }
}

/// Partition a dataset by exact equality of its run identifier.
pub fn split_runs(dataset: &Dataset) -> Result<RunPartition> {
    if dataset.schema().run.is_none() {
        let expected = dataset.schema().convention.column_names().run;
        return Err(MetabarError::Schema(format!(
            "no run column found (expected '{}')",
            expected
        )));
    }

    let mut indices: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (idx, record) in dataset.iter().enumerate() {
        let run_id = record.run_id.as_ref().ok_or_else(|| {
            MetabarError::Schema(format!("record {} has no run identifier", idx))
        })?;
        indices.entry(run_id.clone()).or_default().push(idx);
    }

    let mut runs = IndexMap::with_capacity(indices.len());
    for (run_id, idx) in indices {
        let subset = dataset.subset(&idx)?;
        runs.insert(run_id, subset);
    }

    log::info!("Split {} records into {} runs", dataset.len(), runs.len());
    Ok(RunPartition { runs })
}
