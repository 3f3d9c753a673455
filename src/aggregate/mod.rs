//! Per-partition detection counts and read sums.

mod detections;
mod reads;

pub use detections::count_detections;
pub use reads::sum_reads;

use crate::data::{Dataset, DetectionTable, ReadSumTable};
use crate::partition::{NestedPartitions, Partitions};
use indexmap::IndexMap;
use rayon::prelude::*;

/// Label → detection table.
pub type DetectionsByLabel = IndexMap<String, DetectionTable>;
/// Label → read-sum table.
pub type ReadsByLabel = IndexMap<String, ReadSumTable>;
/// Sampler → area → detection table.
pub type NestedDetections = IndexMap<String, DetectionsByLabel>;
/// Sampler → area → read-sum table.
pub type NestedReads = IndexMap<String, ReadsByLabel>;

fn map_partitions<T, F>(partitions: &Partitions, f: F) -> IndexMap<String, T>
where
    T: Send,
    F: Fn(&Dataset) -> T + Sync,
{
    let entries: Vec<(&String, &Dataset)> = partitions.iter().collect();
    entries
        .into_par_iter()
        .map(|(label, dataset)| (label.clone(), f(dataset)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Detection table for every partition. Empty partitions give empty tables.
pub fn count_detections_by(partitions: &Partitions, aliquot_mode: bool) -> DetectionsByLabel {
    map_partitions(partitions, |ds| count_detections(ds, aliquot_mode))
}

/// Read-sum table for every partition. Empty partitions give empty tables.
pub fn sum_reads_by(partitions: &Partitions) -> ReadsByLabel {
    map_partitions(partitions, sum_reads)
}

pub fn count_detections_nested(nested: &NestedPartitions, aliquot_mode: bool) -> NestedDetections {
    nested
        .iter()
        .map(|(sampler, areas)| (sampler.clone(), count_detections_by(areas, aliquot_mode)))
        .collect()
}

pub fn sum_reads_nested(nested: &NestedPartitions) -> NestedReads {
    nested
        .iter()
        .map(|(sampler, areas)| (sampler.clone(), sum_reads_by(areas)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, SchemaConvention};
    use crate::partition::{define_areas, partition_by_sampler_area, PartitionOptions};

    #[test]
    fn test_nested_empty_cell_yields_empty_tables() {
        let ds = Dataset::from_records(
            SchemaConvention::Alternate,
            vec![
                Record::new("R1", "AreaX_S2", "a", 5),
                Record::new("R1", "AreaY_S1", "b", 5),
            ],
        )
        .unwrap();
        let areas = define_areas(&ds, '_');
        let nested =
            partition_by_sampler_area(&ds, &["S1", "S2"], &areas, &PartitionOptions::default())
                .unwrap();

        let detections = count_detections_nested(&nested, false);
        let reads = sum_reads_nested(&nested);

        assert!(detections["S1"]["AreaX"].is_empty());
        assert!(reads["S1"]["AreaX"].is_empty());
        assert_eq!(detections["S1"]["AreaY"].get("b"), Some(1));
        assert_eq!(reads["S2"]["AreaX"].get("a"), Some(5));
        // Label order survives the parallel map
        assert_eq!(detections["S1"].keys().collect::<Vec<_>>(), vec!["AreaX", "AreaY"]);
    }
}
