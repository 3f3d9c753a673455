//! Whole-sampler overview lists.

use super::merge::{merge_final, FinalTables};
use crate::aggregate::{count_detections, sum_reads};
use crate::data::{DetectionScope, ReportLabels};
use crate::partition::Partitions;

/// One table per sampler over all of its records, ignoring areas.
///
/// Every record counts as a detection here, regardless of aliquot mode, and
/// rows are listed alphabetically by taxon.
pub fn sampler_overview(samplers: &Partitions, labels: ReportLabels) -> FinalTables {
    samplers
        .iter()
        .map(|(sampler, dataset)| {
            let mut table = merge_final(
                &count_detections(dataset, false),
                &sum_reads(dataset),
                labels,
                DetectionScope::Overall,
            );
            table.rows.sort_by(|a, b| a.taxon.cmp(&b.taxon));
            (sampler.clone(), table)
        })
        .collect()
}
