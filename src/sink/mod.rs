//! Writing named result tables.
//!
//! A sink receives single tables and workbooks (ordered, named sheets). The
//! naming rule for partitioned output is `<base>_<label>` for one dimension;
//! for sampler × area output every sampler gets a workbook
//! `<base>_<sampler>` whose sheets are areas, giving `<base>_<sampler>_<area>`.

mod delimited;

pub use delimited::DelimitedSink;

use crate::consolidate::{ConsolidatedReport, FinalTables};
use crate::data::Table;
use crate::error::Result;
use crate::pipeline::{PipelineOutput, ThresholdOutput};
use serde::{Deserialize, Serialize};

/// Destination for result tables.
pub trait ResultSink {
    /// Write one stand-alone table.
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()>;

    /// Write a collection of named sheets under one workbook name.
    fn write_workbook(&mut self, name: &str, sheets: &[(String, Table)]) -> Result<()>;
}

/// Base names of every output table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputNames {
    pub filtered: String,
    pub rejected: String,
    pub thresholds: String,
    pub results: String,
    pub overview: String,
}

impl Default for OutputNames {
    fn default() -> Self {
        Self {
            filtered: "filtered".to_string(),
            rejected: "rejected".to_string(),
            thresholds: "thresholds".to_string(),
            results: "results".to_string(),
            overview: "overview".to_string(),
        }
    }
}

/// `<base>_<label>`.
pub fn sheet_name(base: &str, label: &str) -> String {
    format!("{}_{}", base, label)
}

/// Make a table name safe to use as a file stem.
pub fn file_stem(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn sheets(tables: &FinalTables) -> Vec<(String, Table)> {
    tables
        .iter()
        .map(|(label, table)| (label.clone(), table.to_table()))
        .collect()
}

/// Write the filtered, rejected and threshold tables.
pub fn write_threshold_output<S: ResultSink + ?Sized>(
    sink: &mut S,
    output: &ThresholdOutput,
    names: &OutputNames,
) -> Result<()> {
    sink.write_table(&names.filtered, &output.kept.to_table())?;
    sink.write_table(&names.rejected, &output.rejected.to_table())?;
    sink.write_table(&names.thresholds, &output.threshold_table())
}

/// Write a consolidated report following the partition naming rule.
pub fn write_report<S: ResultSink + ?Sized>(
    sink: &mut S,
    report: &ConsolidatedReport,
    names: &OutputNames,
) -> Result<()> {
    match report {
        ConsolidatedReport::Overall(table) => sink.write_table(&names.results, &table.to_table()),
        ConsolidatedReport::BySampler(tables) | ConsolidatedReport::ByArea(tables) => {
            sink.write_workbook(&names.results, &sheets(tables))
        }
        ConsolidatedReport::BySamplerArea { overview, tables } => {
            sink.write_workbook(&names.overview, &sheets(overview))?;
            for (sampler, areas) in tables {
                sink.write_workbook(&sheet_name(&names.results, sampler), &sheets(areas))?;
            }
            Ok(())
        }
    }
}

/// Write everything a pipeline run produced.
pub fn write_pipeline_output<S: ResultSink + ?Sized>(
    sink: &mut S,
    output: &PipelineOutput,
    names: &OutputNames,
) -> Result<()> {
    if let Some(threshold) = &output.threshold {
        write_threshold_output(sink, threshold, names)?;
    }
    write_report(sink, &output.consolidation.report, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidate::{merge_final, NestedFinalTables};
    use crate::data::{DetectionScope, DetectionTable, ReadSumTable, SchemaConvention, TaxonCount};

    #[derive(Default)]
    struct RecordingSink {
        names: Vec<String>,
    }

    impl ResultSink for RecordingSink {
        fn write_table(&mut self, name: &str, _table: &Table) -> Result<()> {
            self.names.push(name.to_string());
            Ok(())
        }

        fn write_workbook(&mut self, name: &str, sheets: &[(String, Table)]) -> Result<()> {
            for (sheet, _) in sheets {
                self.names.push(sheet_name(name, sheet));
            }
            Ok(())
        }
    }

    fn final_table(area: &str) -> crate::data::FinalTable {
        merge_final(
            &DetectionTable::new(vec![TaxonCount::new("a", 1)]),
            &ReadSumTable::new(vec![TaxonCount::new("a", 9)]),
            SchemaConvention::Alternate.labels(),
            DetectionScope::Area(area),
        )
    }

    #[test]
    fn test_nested_naming_rule() {
        let mut overview = FinalTables::new();
        overview.insert("S1".into(), final_table("all"));
        let mut tables = NestedFinalTables::new();
        let mut s1 = FinalTables::new();
        s1.insert("AreaX".into(), final_table("AreaX"));
        s1.insert("AreaY".into(), final_table("AreaY"));
        tables.insert("S1".into(), s1);

        let report = ConsolidatedReport::BySamplerArea { overview, tables };
        let mut sink = RecordingSink::default();
        write_report(&mut sink, &report, &OutputNames::default()).unwrap();

        assert_eq!(
            sink.names,
            vec!["overview_S1", "results_S1_AreaX", "results_S1_AreaY"]
        );
    }

    #[test]
    fn test_one_dimension_naming_rule() {
        let mut tables = FinalTables::new();
        tables.insert("North".into(), final_table("North"));
        let mut sink = RecordingSink::default();
        write_report(&mut sink, &ConsolidatedReport::ByArea(tables), &OutputNames::default())
            .unwrap();
        assert_eq!(sink.names, vec!["results_North"]);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("results_S1/AreaX"), "results_S1_AreaX");
        assert_eq!(file_stem(" a:b "), "a_b");
    }
}
