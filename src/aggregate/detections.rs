//! Detection counting.

use crate::data::{Dataset, DetectionTable, TaxonCount};
use std::collections::{HashMap, HashSet};

/// Count detections of every taxon in a dataset.
///
/// In aliquot mode, and when the dataset has a point column, a taxon counts
/// once per distinct point it was seen at, however many records report it
/// there. Otherwise every record counts as one detection. A record with a
/// blank point counts as one detection on its own.
pub fn count_detections(dataset: &Dataset, aliquot_mode: bool) -> DetectionTable {
    let mut counts: HashMap<&str, u64> = HashMap::new();

    if aliquot_mode && dataset.schema().has_points() {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for record in dataset.iter() {
            let first_at_point = match record.point_id.as_deref() {
                Some(point) => seen.insert((point, record.taxon.as_str())),
                None => true,
            };
            if first_at_point {
                *counts.entry(record.taxon.as_str()).or_insert(0) += 1;
            }
        }
    } else {
        for record in dataset.iter() {
            *counts.entry(record.taxon.as_str()).or_insert(0) += 1;
        }
    }

    DetectionTable::new(
        counts
            .into_iter()
            .map(|(taxon, count)| TaxonCount::new(taxon, count))
            .collect(),
    )
}
