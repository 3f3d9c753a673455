//! Read summation per taxon.

use crate::data::{Dataset, ReadSumTable, TaxonCount};
use std::collections::HashMap;

/// Sum the reads of every taxon in a dataset.
pub fn sum_reads(dataset: &Dataset) -> ReadSumTable {
    let mut sums: HashMap<&str, u64> = HashMap::new();
    for record in dataset.iter() {
        let sum = sums.entry(record.taxon.as_str()).or_insert(0);
        *sum = sum.saturating_add(record.read_count);
    }

    ReadSumTable::new(
        sums.into_iter()
            .map(|(taxon, count)| TaxonCount::new(taxon, count))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, SchemaConvention};

    #[test]
    fn test_sum_reads() {
        let ds = Dataset::from_records(
            SchemaConvention::Alternate,
            vec![
                Record::new("R1", "X_S1", "a", 5).at_point("P1"),
                Record::new("R1", "X_S1", "a", 99).at_point("P1"),
                Record::new("R2", "Y_S1", "b", 200),
            ],
        )
        .unwrap();
        let table = sum_reads(&ds);
        assert_eq!(table.get("a"), Some(104));
        assert_eq!(table.get("b"), Some(200));
        assert_eq!(table.sums[0].taxon, "b");
        assert_eq!(table.total(), ds.total_reads());
    }
}
