//! Aggregate and report tables.

use serde::{Deserialize, Serialize};

/// A rendered table: header plus string cells, the unit written by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// A count attached to a taxon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonCount {
    pub taxon: String,
    pub count: u64,
}

impl TaxonCount {
    pub fn new(taxon: &str, count: u64) -> Self {
        Self {
            taxon: taxon.to_string(),
            count,
        }
    }
}

/// Detection counts per taxon for one partition.
///
/// Sorted by count descending, ties by taxon name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionTable {
    pub counts: Vec<TaxonCount>,
}

/// Summed read counts per taxon for one partition.
///
/// Sorted by reads descending, ties by taxon name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSumTable {
    pub sums: Vec<TaxonCount>,
}

fn sort_counts(counts: &mut [TaxonCount]) {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.taxon.cmp(&b.taxon)));
}

fn lookup(counts: &[TaxonCount], taxon: &str) -> Option<u64> {
    counts.iter().find(|c| c.taxon == taxon).map(|c| c.count)
}

impl DetectionTable {
    pub fn new(mut counts: Vec<TaxonCount>) -> Self {
        sort_counts(&mut counts);
        Self { counts }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn get(&self, taxon: &str) -> Option<u64> {
        lookup(&self.counts, taxon)
    }
}

impl ReadSumTable {
    pub fn new(mut sums: Vec<TaxonCount>) -> Self {
        sort_counts(&mut sums);
        Self { sums }
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    pub fn get(&self, taxon: &str) -> Option<u64> {
        lookup(&self.sums, taxon)
    }

    pub fn total(&self) -> u64 {
        self.sums.iter().map(|s| s.count).sum()
    }
}

/// One taxon of a final report. A missing side of the outer merge is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRow {
    pub taxon: String,
    pub reads: Option<u64>,
    pub detections: Option<u64>,
}

/// Outer-merged read sums and detection counts for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTable {
    pub taxon_header: String,
    pub reads_header: String,
    pub detections_header: String,
    pub rows: Vec<FinalRow>,
}

impl FinalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, taxon: &str) -> Option<&FinalRow> {
        self.rows.iter().find(|r| r.taxon == taxon)
    }

    pub fn taxa(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.taxon.as_str()).collect()
    }

    /// Render as `taxon, reads, detections`; nulls become empty cells.
    pub fn to_table(&self) -> Table {
        let cell = |v: Option<u64>| v.map(|n| n.to_string()).unwrap_or_default();
        Table::new(
            vec![
                self.taxon_header.clone(),
                self.reads_header.clone(),
                self.detections_header.clone(),
            ],
            self.rows
                .iter()
                .map(|r| vec![r.taxon.clone(), cell(r.reads), cell(r.detections)])
                .collect(),
        )
    }
}
