//! Outer merge of detection counts and read sums into final tables.

use crate::aggregate::{DetectionsByLabel, NestedDetections, NestedReads, ReadsByLabel};
use crate::data::{DetectionScope, DetectionTable, FinalRow, FinalTable, ReadSumTable, ReportLabels};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label → final table.
pub type FinalTables = IndexMap<String, FinalTable>;
/// Sampler → area → final table.
pub type NestedFinalTables = IndexMap<String, FinalTables>;

/// Bookkeeping of partition pairing during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Partitions present on both sides and merged.
    pub merged: usize,
    /// Partitions present on only one side and skipped.
    pub skipped: usize,
}

impl MergeStats {
    fn absorb(&mut self, other: MergeStats) {
        self.merged += other.merged;
        self.skipped += other.skipped;
    }
}

impl std::fmt::Display for MergeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} merged, {} skipped", self.merged, self.skipped)
    }
}

/// Outer-join a detection table and a read-sum table on taxon.
///
/// A taxon present on one side only gets `None` on the other. Rows are
/// sorted by reads descending (missing reads last), ties by taxon.
pub fn merge_final(
    detections: &DetectionTable,
    reads: &ReadSumTable,
    labels: ReportLabels,
    scope: DetectionScope<'_>,
) -> FinalTable {
    let detection_map: HashMap<&str, u64> = detections
        .counts
        .iter()
        .map(|c| (c.taxon.as_str(), c.count))
        .collect();
    let read_map: HashMap<&str, u64> = reads
        .sums
        .iter()
        .map(|c| (c.taxon.as_str(), c.count))
        .collect();

    let taxa: IndexSet<&str> = reads
        .sums
        .iter()
        .map(|c| c.taxon.as_str())
        .chain(detections.counts.iter().map(|c| c.taxon.as_str()))
        .collect();

    let mut rows: Vec<FinalRow> = taxa
        .into_iter()
        .map(|taxon| FinalRow {
            taxon: taxon.to_string(),
            reads: read_map.get(taxon).copied(),
            detections: detection_map.get(taxon).copied(),
        })
        .collect();
    rows.sort_by(|a, b| b.reads.cmp(&a.reads).then_with(|| a.taxon.cmp(&b.taxon)));

    FinalTable {
        taxon_header: labels.taxon().to_string(),
        reads_header: labels.reads().to_string(),
        detections_header: labels.detections(scope),
        rows,
    }
}

/// Merge one-level partitions whose labels match.
///
/// `scope` builds the detection header from a partition label. A label found
/// on only one side is skipped and counted.
pub fn merge_by_label<F>(
    detections: &DetectionsByLabel,
    reads: &ReadsByLabel,
    labels: ReportLabels,
    scope: F,
) -> (FinalTables, MergeStats)
where
    F: for<'a> Fn(&'a str) -> DetectionScope<'a>,
{
    let mut tables = FinalTables::with_capacity(reads.len());
    let mut stats = MergeStats::default();

    for (label, read_table) in reads {
        match detections.get(label) {
            Some(detection_table) => {
                let table =
                    merge_final(detection_table, read_table, labels, scope(label.as_str()));
                tables.insert(label.clone(), table);
                stats.merged += 1;
            }
            None => {
                log::warn!("No detection table for partition '{}'; skipped", label);
                stats.skipped += 1;
            }
        }
    }
    for label in detections.keys().filter(|l| !reads.contains_key(*l)) {
        log::warn!("No read table for partition '{}'; skipped", label);
        stats.skipped += 1;
    }

    (tables, stats)
}

/// Merge sampler × area partitions.
///
/// A detection cell is merged only with the read cell carrying the identical
/// `(sampler, area)` pair; unmatched cells on either side are skipped and
/// counted, never merged by position.
pub fn merge_nested(
    detections: &NestedDetections,
    reads: &NestedReads,
    labels: ReportLabels,
) -> (NestedFinalTables, MergeStats) {
    let detection_cells: HashMap<(&str, &str), &DetectionTable> = detections
        .iter()
        .flat_map(|(sampler, areas)| {
            areas
                .iter()
                .map(move |(area, table)| ((sampler.as_str(), area.as_str()), table))
        })
        .collect();

    let mut tables = NestedFinalTables::with_capacity(reads.len());
    let mut stats = MergeStats::default();
    let mut matched: usize = 0;

    for (sampler, areas) in reads {
        let mut sampler_tables = FinalTables::with_capacity(areas.len());
        let mut sampler_stats = MergeStats::default();

        for (area, read_table) in areas {
            let key = (sampler.as_str(), area.as_str());
            match detection_cells.get(&key) {
                Some(detection_table) => {
                    let table =
                        merge_final(detection_table, read_table, labels, DetectionScope::Area(area));
                    sampler_tables.insert(area.clone(), table);
                    sampler_stats.merged += 1;
                    matched += 1;
                }
                None => {
                    log::warn!(
                        "No detection table for sampler '{}', area '{}'; skipped",
                        sampler,
                        area
                    );
                    sampler_stats.skipped += 1;
                }
            }
        }

        stats.absorb(sampler_stats);
        tables.insert(sampler.clone(), sampler_tables);
    }

    let unmatched_detections = detection_cells.len() - matched;
    if unmatched_detections > 0 {
        log::warn!(
            "{} detection tables had no matching read table; skipped",
            unmatched_detections
        );
        stats.skipped += unmatched_detections;
    }

    (tables, stats)
}
