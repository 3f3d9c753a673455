//! Sampler × area partitioning.

use super::{
    partition_by_area, partition_by_sampler, EmptyPartitionPolicy, NestedPartitions,
    PartitionOptions, Partitions,
};
use crate::data::Dataset;
use crate::error::Result;

/// Partition by sampler, then every sampler partition by every known area.
///
/// Under [`EmptyPartitionPolicy::Emit`]
/// every sampler × area cell exists, even when it holds no records.
pub fn partition_by_sampler_area<S: AsRef<str>, A: AsRef<str>>(
    dataset: &Dataset,
    labels: &[S],
    areas: &[A],
    options: &PartitionOptions,
) -> Result<NestedPartitions> {
    let samplers = partition_by_sampler(dataset, labels, options)?;
    Ok(split_samplers_by_area(&samplers, areas, options))
}

/// Split already partitioned samplers by every known area.
pub fn split_samplers_by_area<A: AsRef<str>>(
    samplers: &Partitions,
    areas: &[A],
    options: &PartitionOptions,
) -> NestedPartitions {
    let mut nested = NestedPartitions::with_capacity(samplers.len());

    for (sampler, subset) in samplers {
        let by_area = partition_by_area(subset, areas, options);
        if by_area.is_empty() && options.empty_partitions == EmptyPartitionPolicy::Omit {
            log::debug!("Omitting sampler '{}': no area holds records", sampler);
            continue;
        }
        nested.insert(sampler.clone(), by_area);
    }

    nested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, SchemaConvention};
    use crate::partition::define_areas;

    fn dataset() -> Dataset {
        Dataset::from_records(
            SchemaConvention::Alternate,
            vec![
                Record::new("R1", "AreaX_S1", "a", 5),
                Record::new("R1", "AreaY_S2", "b", 5),
                Record::new("R1", "AreaY_S1", "c", 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_every_cell_present_when_emitting() {
        let ds = dataset();
        let areas = define_areas(&ds, '_');
        let nested =
            partition_by_sampler_area(&ds, &["S1", "S2"], &areas, &PartitionOptions::default())
                .unwrap();

        assert_eq!(nested.len(), 2);
        assert_eq!(nested["S1"].len(), 2);
        assert_eq!(nested["S2"].len(), 2);
        assert!(nested["S2"]["AreaX"].is_empty());
        assert_eq!(nested["S2"]["AreaY"].len(), 1);
        assert_eq!(nested["S1"].keys().collect::<Vec<_>>(), vec!["AreaX", "AreaY"]);
    }

    #[test]
    fn test_empty_cells_omitted() {
        let ds = dataset();
        let areas = define_areas(&ds, '_');
        let options = PartitionOptions {
            empty_partitions: EmptyPartitionPolicy::Omit,
            ..Default::default()
        };
        let nested = partition_by_sampler_area(&ds, &["S1", "S2", "S3"], &areas, &options).unwrap();

        assert!(!nested.contains_key("S3"));
        assert!(!nested["S2"].contains_key("AreaX"));
        assert_eq!(nested["S1"].len(), 2);
    }

    #[test]
    fn test_split_existing_sampler_partitions() {
        let ds = dataset();
        let areas = define_areas(&ds, '_');
        let options = PartitionOptions::default();
        let samplers = partition_by_sampler(&ds, &["S1", "S2"], &options).unwrap();

        let nested = split_samplers_by_area(&samplers, &areas, &options);
        assert_eq!(samplers.len(), 2);
        assert_eq!(nested["S1"]["AreaX"].len(), 1);
        assert_eq!(nested["S1"]["AreaY"].len(), 1);
        assert_eq!(nested["S2"]["AreaY"].records()[0].taxon, "b");
    }
}
