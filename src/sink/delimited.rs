//! Delimited-text sink: one file per table or worksheet.

use super::{file_stem, ResultSink};
use crate::data::Table;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes tables as delimited text files under a directory.
///
/// A table named `name` lands in `<dir>/<name>.<ext>`; a workbook sheet in
/// `<dir>/<workbook>_<sheet>.<ext>`.
#[derive(Debug, Clone)]
pub struct DelimitedSink {
    dir: PathBuf,
    delimiter: u8,
    extension: &'static str,
    written: Vec<PathBuf>,
}

impl DelimitedSink {
    /// Create a sink, creating the output directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P, delimiter: u8) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let extension = match delimiter {
            b'\t' => "tsv",
            _ => "csv",
        };
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            delimiter,
            extension,
            written: Vec::new(),
        })
    }

    pub fn tsv<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::new(dir, b'\t')
    }

    pub fn csv<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::new(dir, b',')
    }

    /// Files written so far, in write order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// Path a table of this name is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(name), self.extension))
    }

    fn write_file(&mut self, name: &str, table: &Table) -> Result<()> {
        let path = self.path_for(name);
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(&path)?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        log::debug!("Wrote {} rows to {:?}", table.n_rows(), path);
        self.written.push(path);
        Ok(())
    }
}

impl ResultSink for DelimitedSink {
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        self.write_file(name, table)
    }

    fn write_workbook(&mut self, name: &str, sheets: &[(String, Table)]) -> Result<()> {
        for (sheet, table) in sheets {
            self.write_file(&super::sheet_name(name, sheet), table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> Table {
        Table::new(
            vec!["Taxon".into(), "Reads".into()],
            vec![vec!["Homo sapiens".into(), "12".into()]],
        )
    }

    #[test]
    fn test_write_table_and_workbook() {
        let dir = TempDir::new().unwrap();
        let mut sink = DelimitedSink::tsv(dir.path()).unwrap();

        sink.write_table("thresholds", &table()).unwrap();
        sink.write_workbook(
            "results",
            &[("S1".to_string(), table()), ("S2".to_string(), table())],
        )
        .unwrap();

        assert_eq!(sink.written().len(), 3);
        assert!(dir.path().join("results_S1.tsv").exists());
        assert!(dir.path().join("results_S2.tsv").exists());

        let content = std::fs::read_to_string(dir.path().join("thresholds.tsv")).unwrap();
        assert_eq!(content, "Taxon\tReads\nHomo sapiens\t12\n");
    }

    #[test]
    fn test_csv_quotes_cells_with_delimiter() {
        let dir = TempDir::new().unwrap();
        let mut sink = DelimitedSink::csv(dir.path()).unwrap();
        let t = Table::new(vec!["Taxon".into()], vec![vec!["a, b".into()]]);
        sink.write_table("quoted", &t).unwrap();
        let content = std::fs::read_to_string(sink.path_for("quoted")).unwrap();
        assert_eq!(content, "Taxon\n\"a, b\"\n");
    }
}
