//! Re-assembling per-run results into whole-dataset tables.

use crate::data::Dataset;
use crate::error::Result;
use indexmap::IndexMap;

/// Concatenate per-run datasets in run order.
///
/// `template` supplies the header; it is normally the dataset the runs were
/// split from.
pub fn concat_runs(template: &Dataset, by_run: &IndexMap<String, Dataset>) -> Result<Dataset> {
    template.concat(by_run.values())
}
