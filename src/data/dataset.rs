//! Taxonomic-assignment records and the in-memory dataset holding them.

use crate::data::schema::{resolve_schema, ResolvedSchema, SchemaConvention};
use crate::data::table::Table;
use crate::error::{MetabarError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One detected taxonomic unit in one sample of one sequencing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Sequencing batch; `None` when the input has no run column or the cell is blank.
    pub run_id: Option<String>,
    /// Sample code, conventionally `{area}_{sampler}`.
    pub sample_id: String,
    /// Aliquot/point within the sample; `None` when absent or blank.
    pub point_id: Option<String>,
    /// Curated taxonomic call.
    pub taxon: String,
    /// Reads supporting this record.
    pub read_count: u64,
}

impl Record {
    pub fn new(run_id: &str, sample_id: &str, taxon: &str, read_count: u64) -> Self {
        Self {
            run_id: Some(run_id.to_string()),
            sample_id: sample_id.to_string(),
            point_id: None,
            taxon: taxon.to_string(),
            read_count,
        }
    }

    /// Builder-style setter for the point identifier.
    pub fn at_point(mut self, point_id: &str) -> Self {
        self.point_id = Some(point_id.to_string());
        self
    }
}

/// An ordered collection of records sharing one header row.
///
/// The original cells of every row are kept next to the parsed record so a
/// derived dataset can be written back with all of its input columns.
/// Datasets are never modified in place; every operation returns a new one.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: Vec<String>,
    schema: ResolvedSchema,
    records: Vec<Record>,
    rows: Vec<Vec<String>>,
}

/// Pick a delimiter from a file extension: tab for `.tsv`/`.txt`, comma otherwise.
pub fn delimiter_for_path<P: AsRef<Path>>(path: P) -> u8 {
    match path
        .as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

fn parse_read_count(value: &str, row: usize, column: &str) -> Result<u64> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }
    // Spreadsheet exports often write integral counts as floats
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v < u64::MAX as f64 && v.fract() == 0.0 => {
            Ok(v as u64)
        }
        _ => Err(MetabarError::InvalidCount {
            value: value.to_string(),
            row,
            column: column.to_string(),
        }),
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

impl Dataset {
    /// Build a dataset from header and raw rows, resolving the schema.
    ///
    /// Every row is brought to the header's width: short rows are padded with
    /// blank cells and trailing blank cells are dropped. A non-blank cell
    /// beyond the header is an error.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let schema = resolve_schema(&headers)?;
        let reads_header = headers[schema.reads].clone();
        let width = headers.len();

        let mut records = Vec::with_capacity(rows.len());
        let mut kept_rows = Vec::with_capacity(rows.len());
        let mut total_reads: u64 = 0;

        for (row_idx, mut row) in rows.into_iter().enumerate() {
            if row.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            if row.len() > width {
                if let Some(extra) = row[width..].iter().find(|cell| !cell.trim().is_empty()) {
                    return Err(MetabarError::InvalidParameter(format!(
                        "row {} has {} cells but the header has {} (extra value '{}')",
                        row_idx,
                        row.len(),
                        width,
                        extra
                    )));
                }
            }
            row.resize(width, String::new());

            let sample_id = row[schema.sample].trim().to_string();
            let taxon = row[schema.taxon].trim().to_string();
            let read_count = parse_read_count(&row[schema.reads], row_idx, &reads_header)?;
            total_reads = total_reads.checked_add(read_count).ok_or_else(|| {
                MetabarError::InvalidCount {
                    value: row[schema.reads].clone(),
                    row: row_idx,
                    column: reads_header.clone(),
                }
            })?;

            records.push(Record {
                run_id: schema.run.and_then(|i| non_blank(row.get(i))),
                sample_id,
                point_id: schema.point.and_then(|i| non_blank(row.get(i))),
                taxon,
                read_count,
            });
            kept_rows.push(row);
        }

        Ok(Self {
            headers,
            schema,
            records,
            rows: kept_rows,
        })
    }

    /// Load a delimited table with a header row.
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(MetabarError::EmptyData("Input has no header row".to_string()));
        }

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        let dataset = Self::from_rows(headers, rows)?;
        if dataset.is_empty() {
            return Err(MetabarError::EmptyData("Input has no data rows".to_string()));
        }
        Ok(dataset)
    }

    /// Load a delimited file, choosing the delimiter from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let delimiter = delimiter_for_path(&path);
        Self::from_path_with_delimiter(path, delimiter)
    }

    /// Load a delimited file with an explicit delimiter.
    pub fn from_path_with_delimiter<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    /// Load a comma-separated file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with_delimiter(path, b',')
    }

    /// Load a tab-separated file.
    pub fn from_tsv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with_delimiter(path, b'\t')
    }

    /// Build a dataset from parsed records using a convention's header names.
    ///
    /// The run and point columns are only emitted when some record carries them.
    pub fn from_records(convention: SchemaConvention, records: Vec<Record>) -> Result<Self> {
        let names = convention.column_names();
        let with_run = records.iter().any(|r| r.run_id.is_some());
        let with_point = records.iter().any(|r| r.point_id.is_some());

        let mut headers = Vec::new();
        if with_run {
            headers.push(names.run.to_string());
        }
        headers.push(names.sample.to_string());
        if with_point {
            headers.push(names.point.to_string());
        }
        headers.push(names.taxon.to_string());
        headers.push(names.reads.to_string());

        let rows = records
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(headers.len());
                if with_run {
                    row.push(r.run_id.clone().unwrap_or_default());
                }
                row.push(r.sample_id.clone());
                if with_point {
                    row.push(r.point_id.clone().unwrap_or_default());
                }
                row.push(r.taxon.clone());
                row.push(r.read_count.to_string());
                row
            })
            .collect();

        Self::from_rows(headers, rows)
    }

    /// An empty dataset with this dataset's header and schema.
    pub fn empty_like(&self) -> Self {
        Self {
            headers: self.headers.clone(),
            schema: self.schema,
            records: Vec::new(),
            rows: Vec::new(),
        }
    }

    #[inline]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[inline]
    pub fn schema(&self) -> &ResolvedSchema {
        &self.schema
    }

    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Sum of read counts over all records.
    pub fn total_reads(&self) -> u64 {
        self.records
            .iter()
            .fold(0u64, |total, r| total.saturating_add(r.read_count))
    }

    /// Distinct sample identifiers in first-seen order.
    pub fn distinct_samples(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .map(|r| r.sample_id.as_str())
            .filter(|s| seen.insert(*s))
            .collect()
    }

    /// Subset to the given record positions, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let mut records = Vec::with_capacity(indices.len());
        let mut rows = Vec::with_capacity(indices.len());
        for &idx in indices {
            if idx >= self.records.len() {
                return Err(MetabarError::InvalidParameter(format!(
                    "Record index {} out of bounds",
                    idx
                )));
            }
            records.push(self.records[idx].clone());
            rows.push(self.rows[idx].clone());
        }
        Ok(Self {
            headers: self.headers.clone(),
            schema: self.schema,
            records,
            rows,
        })
    }

    /// Keep the records matching a predicate.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool,
    {
        let (records, rows) = self
            .records
            .iter()
            .zip(&self.rows)
            .filter(|(record, _)| predicate(record))
            .map(|(record, row)| (record.clone(), row.clone()))
            .unzip();
        Self {
            headers: self.headers.clone(),
            schema: self.schema,
            records,
            rows,
        }
    }

    /// Split into (matching, non-matching) datasets in a single pass.
    pub fn partition<F>(&self, predicate: F) -> (Self, Self)
    where
        F: Fn(&Record) -> bool,
    {
        let mut yes = self.empty_like();
        let mut no = self.empty_like();
        for (record, row) in self.records.iter().zip(&self.rows) {
            let target = if predicate(record) { &mut yes } else { &mut no };
            target.records.push(record.clone());
            target.rows.push(row.clone());
        }
        (yes, no)
    }

    /// Concatenate datasets that share this dataset's header row.
    ///
    /// `self` only supplies the header and schema; its own records are not
    /// included.
    pub fn concat<'a, I>(&self, parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Dataset>,
    {
        let mut out = self.empty_like();
        for part in parts {
            if part.headers != self.headers {
                return Err(MetabarError::Schema(format!(
                    "cannot concatenate tables with different headers: [{}] vs [{}]",
                    part.headers.join(", "),
                    self.headers.join(", ")
                )));
            }
            out.records.extend(part.records.iter().cloned());
            out.rows.extend(part.rows.iter().cloned());
        }
        Ok(out)
    }

    /// Render with the original header and cells.
    pub fn to_table(&self) -> Table {
        Table::new(self.headers.clone(), self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY_CSV: &str = "Corrida,Amostra,Ponto,OTUFinal,N_reads,Obs\n\
        R1,AreaX_S1,P1,Taxon a,10,first\n\
        R1,AreaX_S1,P1,Taxon b,1.0,\n\
        ,,,,,\n\
        R2,AreaY_S2,,Taxon c,100,last\n";

    #[test]
    fn test_load_primary_csv() {
        let ds = Dataset::from_reader(PRIMARY_CSV.as_bytes(), b',').unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.schema().convention, SchemaConvention::Primary);
        assert_eq!(ds.records()[1].read_count, 1);
        assert_eq!(ds.records()[0].point_id.as_deref(), Some("P1"));
        assert_eq!(ds.records()[2].point_id, None);
        assert_eq!(ds.total_reads(), 111);
        // Extra columns survive the round trip
        let table = ds.to_table();
        assert_eq!(table.headers[5], "Obs");
        assert_eq!(table.rows[2][5], "last");
    }

    #[test]
    fn test_invalid_count() {
        let input = "Run,Sample,FinalOTU,N_reads\nR1,A_S1,t,-3\n";
        let err = Dataset::from_reader(input.as_bytes(), b',').unwrap_err();
        match err {
            MetabarError::InvalidCount { value, row, column } => {
                assert_eq!(value, "-3");
                assert_eq!(row, 0);
                assert_eq!(column, "N_reads");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_header_only_is_empty_data() {
        let input = "Run\tSample\tFinalOTU\tN_reads\n";
        let err = Dataset::from_reader(input.as_bytes(), b'\t').unwrap_err();
        assert!(matches!(err, MetabarError::EmptyData(_)));
    }

    #[test]
    fn test_from_records_and_partition() {
        let ds = Dataset::from_records(
            SchemaConvention::Alternate,
            vec![
                Record::new("R1", "A_S1", "t1", 5),
                Record::new("R1", "A_S2", "t2", 0),
                Record::new("R2", "B_S1", "t1", 7),
            ],
        )
        .unwrap();
        assert_eq!(ds.headers(), &["Run", "Sample", "FinalOTU", "N_reads"]);
        assert_eq!(ds.distinct_samples(), vec!["A_S1", "A_S2", "B_S1"]);

        let (zero, nonzero) = ds.partition(|r| r.read_count == 0);
        assert_eq!(zero.len(), 1);
        assert_eq!(nonzero.len(), 2);

        let joined = ds.concat([&nonzero, &zero]).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.records()[2].taxon, "t2");
    }

    #[test]
    fn test_subset_out_of_bounds() {
        let ds = Dataset::from_records(
            SchemaConvention::Canonical,
            vec![Record::new("R1", "A_S1", "t1", 5)],
        )
        .unwrap();
        assert!(ds.subset(&[0]).is_ok());
        assert!(ds.subset(&[1]).is_err());
    }

    #[test]
    fn test_delimiter_for_path() {
        assert_eq!(delimiter_for_path("a/b.tsv"), b'\t');
        assert_eq!(delimiter_for_path("a/b.CSV"), b',');
        assert_eq!(delimiter_for_path("noext"), b',');
    }

    #[test]
    fn test_ragged_rows_fit_header() {
        let ds = Dataset::from_reader(
            "Run,Sample,FinalOTU,N_reads,Note\nR1,A_S1,t,50\nR1,A_S1,u,50,,,\n".as_bytes(),
            b',',
        )
        .unwrap();
        assert_eq!(ds.len(), 2);
        assert!(ds.to_table().rows.iter().all(|row| row.len() == 5));

        let dir = tempfile::TempDir::new().unwrap();
        let mut sink = crate::sink::DelimitedSink::csv(dir.path()).unwrap();
        crate::sink::ResultSink::write_table(&mut sink, "filtered", &ds.to_table()).unwrap();
    }

    #[test]
    fn test_extra_value_beyond_header_rejected() {
        let err = Dataset::from_reader(
            "Run,Sample,FinalOTU,N_reads\nR1,A_S1,t,50\nR1,A_S1,u,50,extra\n".as_bytes(),
            b',',
        )
        .unwrap_err();
        assert!(matches!(err, MetabarError::InvalidParameter(_)));
    }

    #[test]
    fn test_huge_float_count_rejected() {
        let err = Dataset::from_reader(
            "Run,Sample,FinalOTU,N_reads\nR1,A_S1,t,1e30\n".as_bytes(),
            b',',
        )
        .unwrap_err();
        assert!(matches!(err, MetabarError::InvalidCount { .. }));
    }

    #[test]
    fn test_read_total_overflow_rejected() {
        let max = u64::MAX.to_string();
        let input = format!("Run,Sample,FinalOTU,N_reads\nR1,A_S1,t,{}\nR1,A_S1,u,1\n", max);
        let err = Dataset::from_reader(input.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, MetabarError::InvalidCount { row: 1, .. }));
    }
}
