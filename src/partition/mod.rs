//! Partitioning a filtered dataset by sampler, by area, or by both.
//!
//! Partitions are ordered maps from label to sub-dataset. The two-level
//! sampler × area shape is a genuine nested map, so later stages look up a
//! cell by its `(sampler, area)` key rather than by position.

mod area;
mod nested;
mod sampler;

pub use area::{define_areas, partition_by_area, sample_matches_area};
pub use nested::{partition_by_sampler_area, split_samplers_by_area};
pub use sampler::{partition_by_sampler, sample_matches_sampler, validate_sampler_labels};

use crate::data::Dataset;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label → sub-dataset, in label order.
pub type Partitions = IndexMap<String, Dataset>;

/// Sampler → area → sub-dataset.
pub type NestedPartitions = IndexMap<String, IndexMap<String, Dataset>>;

/// Which dimensions a report is split along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKey {
    /// No split: one report for the whole dataset.
    Overall,
    Sampler,
    Area,
    /// Sampler first, then area within each sampler.
    SamplerArea,
}

impl PartitionKey {
    pub fn from_flags(by_sampler: bool, by_area: bool) -> Self {
        match (by_sampler, by_area) {
            (false, false) => PartitionKey::Overall,
            (true, false) => PartitionKey::Sampler,
            (false, true) => PartitionKey::Area,
            (true, true) => PartitionKey::SamplerArea,
        }
    }

    pub fn uses_samplers(&self) -> bool {
        matches!(self, PartitionKey::Sampler | PartitionKey::SamplerArea)
    }
}

/// How a label is matched against a sample identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// The label occurs anywhere in the sample identifier. A record may then
    /// fall under more than one label.
    #[default]
    Substring,
    /// Samplers must equal one delimiter-separated token of the sample
    /// identifier; areas must equal its first token.
    ExactToken,
}

/// What to do with a partition that matches no records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPartitionPolicy {
    /// Keep it; it yields an empty report.
    #[default]
    Emit,
    /// Drop it before aggregation.
    Omit,
}

/// Options shared by all partitioners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOptions {
    pub match_mode: MatchMode,
    pub empty_partitions: EmptyPartitionPolicy,
    /// Separator between area and sampler in a sample identifier.
    pub delimiter: char,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            match_mode: MatchMode::Substring,
            empty_partitions: EmptyPartitionPolicy::Emit,
            delimiter: '_',
        }
    }
}

impl PartitionOptions {
    /// Whether a sub-dataset should be kept under the empty-partition policy.
    pub(crate) fn keeps(&self, subset: &Dataset, label: &str) -> bool {
        if !subset.is_empty() {
            return true;
        }
        match self.empty_partitions {
            EmptyPartitionPolicy::Emit => {
                log::debug!("Partition '{}' matched no records", label);
                true
            }
            EmptyPartitionPolicy::Omit => {
                log::debug!("Omitting partition '{}': no matching records", label);
                false
            }
        }
    }
}
