//! Consolidation of aggregates into final report tables.

mod concat;
mod merge;
mod overview;

pub use concat::concat_runs;
pub use merge::{
    merge_by_label, merge_final, merge_nested, FinalTables, MergeStats, NestedFinalTables,
};
pub use overview::sampler_overview;

use crate::data::FinalTable;
use crate::partition::PartitionKey;

/// Final tables in the shape of the partition key that produced them.
#[derive(Debug, Clone)]
pub enum ConsolidatedReport {
    Overall(FinalTable),
    BySampler(FinalTables),
    ByArea(FinalTables),
    BySamplerArea {
        /// Whole-sampler lists, one per sampler.
        overview: FinalTables,
        /// Sampler → area → final table.
        tables: NestedFinalTables,
    },
}

impl ConsolidatedReport {
    pub fn key(&self) -> PartitionKey {
        match self {
            ConsolidatedReport::Overall(_) => PartitionKey::Overall,
            ConsolidatedReport::BySampler(_) => PartitionKey::Sampler,
            ConsolidatedReport::ByArea(_) => PartitionKey::Area,
            ConsolidatedReport::BySamplerArea { .. } => PartitionKey::SamplerArea,
        }
    }

    /// Number of final tables, not counting overview lists.
    pub fn n_tables(&self) -> usize {
        match self {
            ConsolidatedReport::Overall(_) => 1,
            ConsolidatedReport::BySampler(t) | ConsolidatedReport::ByArea(t) => t.len(),
            ConsolidatedReport::BySamplerArea { tables, .. } => {
                tables.values().map(|areas| areas.len()).sum()
            }
        }
    }
}

/// A consolidated report with its merge bookkeeping.
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub report: ConsolidatedReport,
    pub stats: MergeStats,
}
