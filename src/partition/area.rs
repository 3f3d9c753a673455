//! Partitioning by sampling area.

use super::{MatchMode, PartitionOptions, Partitions};
use crate::data::Dataset;
use std::collections::BTreeSet;

/// Distinct areas of a dataset: the first delimiter-separated component of
/// every sample identifier, sorted.
pub fn define_areas(dataset: &Dataset, delimiter: char) -> Vec<String> {
    dataset
        .distinct_samples()
        .into_iter()
        .filter_map(|sample| sample.split(delimiter).next())
        .map(str::trim)
        .filter(|area| !area.is_empty())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Whether a sample identifier belongs to an area.
pub fn sample_matches_area(sample_id: &str, area: &str, options: &PartitionOptions) -> bool {
    match options.match_mode {
        MatchMode::Substring => sample_id.contains(area),
        MatchMode::ExactToken => sample_id.split(options.delimiter).next() == Some(area),
    }
}

/// Split a dataset into one sub-dataset per area, in the given area order.
pub fn partition_by_area<S: AsRef<str>>(
    dataset: &Dataset,
    areas: &[S],
    options: &PartitionOptions,
) -> Partitions {
    let mut partitions = Partitions::with_capacity(areas.len());
    for area in areas {
        let area = area.as_ref();
        let subset = dataset.filter(|r| sample_matches_area(&r.sample_id, area, options));
        if options.keeps(&subset, area) {
            partitions.insert(area.to_string(), subset);
        }
    }
    partitions
}
