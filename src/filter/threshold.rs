//! Per-run read-abundance threshold.
//!
//! Each run's cutoff is a fixed percentage of that run's total reads. A
//! record is kept only when its reads are strictly greater than the cutoff;
//! ties go to the rejected side.

use crate::data::{Dataset, ReportLabels, Table};
use crate::error::{MetabarError, Result};
use crate::filter::runs::RunPartition;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Threshold percentage used when the caller does not supply one.
pub const DEFAULT_THRESHOLD_PERCENT: f64 = 0.05;

/// Check a numeric threshold percentage.
pub fn validate_threshold_percent(percent: f64) -> Result<f64> {
    if !percent.is_finite() || percent < 0.0 {
        return Err(MetabarError::InvalidThreshold(format!(
            "threshold percentage must be a non-negative number, got {}",
            percent
        )));
    }
    Ok(percent)
}

/// Parse a caller-supplied threshold percentage.
///
/// A blank string selects [`DEFAULT_THRESHOLD_PERCENT`]. A decimal comma is
/// accepted (`"0,05"`).
pub fn parse_threshold_percent(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_THRESHOLD_PERCENT);
    }
    let value: f64 = trimmed.replace(',', ".").parse().map_err(|_| {
        MetabarError::InvalidThreshold(format!("'{}' is not a number", input))
    })?;
    validate_threshold_percent(value)
}

/// Cutoff for a run with `total_reads` reads.
#[inline]
pub fn threshold_value(total_reads: u64, percent: f64) -> f64 {
    total_reads as f64 * percent / 100.0
}

/// The cutoff computed for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunThreshold {
    pub run_id: String,
    pub total_reads: u64,
    pub threshold: f64,
}

/// Cutoffs of all runs, kept for audit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    pub percent: f64,
    pub entries: Vec<RunThreshold>,
}

impl ThresholdTable {
    pub fn get(&self, run_id: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.run_id == run_id)
            .map(|e| e.threshold)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_table(&self, labels: ReportLabels) -> Table {
        Table::new(
            vec![
                labels.run().to_string(),
                labels.total_reads().to_string(),
                labels.threshold().to_string(),
            ],
            self.entries
                .iter()
                .map(|e| {
                    vec![
                        e.run_id.clone(),
                        e.total_reads.to_string(),
                        e.threshold.to_string(),
                    ]
                })
                .collect(),
        )
    }
}

/// What the threshold did to one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFilterSummary {
    pub run_id: String,
    pub n_before: usize,
    pub n_kept: usize,
    pub n_rejected: usize,
    /// Proportion of the run's reads carried by kept records.
    pub reads_retained: f64,
}

impl std::fmt::Display for RunFilterSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  Records before: {}", self.n_before)?;
        writeln!(f, "  Kept:           {}", self.n_kept)?;
        writeln!(f, "  Rejected:       {}", self.n_rejected)?;
        writeln!(f, "  Reads retained: {:.1}%", self.reads_retained * 100.0)?;
        Ok(())
    }
}

/// Kept and rejected records per run plus the cutoffs used.
#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub kept: IndexMap<String, Dataset>,
    pub rejected: IndexMap<String, Dataset>,
    pub thresholds: ThresholdTable,
    pub summaries: Vec<RunFilterSummary>,
}

struct RunOutcome {
    run_id: String,
    kept: Dataset,
    rejected: Dataset,
    threshold: RunThreshold,
    summary: RunFilterSummary,
}

fn filter_run(run_id: &str, run: &Dataset, percent: f64) -> RunOutcome {
    let total_reads = run.total_reads();
    let threshold = threshold_value(total_reads, percent);
    let (kept, rejected) = run.partition(|r| r.read_count as f64 > threshold);

    let reads_retained = if total_reads > 0 {
        kept.total_reads() as f64 / total_reads as f64
    } else {
        0.0
    };

    RunOutcome {
        run_id: run_id.to_string(),
        summary: RunFilterSummary {
            run_id: run_id.to_string(),
            n_before: run.len(),
            n_kept: kept.len(),
            n_rejected: rejected.len(),
            reads_retained,
        },
        threshold: RunThreshold {
            run_id: run_id.to_string(),
            total_reads,
            threshold,
        },
        kept,
        rejected,
    }
}

/// Apply the per-run threshold to every run.
///
/// Cutoffs are computed from each run's own records only.
pub fn apply_threshold(runs: &RunPartition, percent: f64) -> Result<ThresholdResult> {
    let percent = validate_threshold_percent(percent)?;

    let entries: Vec<(&str, &Dataset)> = runs.iter().collect();
    let outcomes: Vec<RunOutcome> = entries
        .into_par_iter()
        .map(|(run_id, run)| filter_run(run_id, run, percent))
        .collect();

    let mut result = ThresholdResult {
        kept: IndexMap::with_capacity(outcomes.len()),
        rejected: IndexMap::with_capacity(outcomes.len()),
        thresholds: ThresholdTable {
            percent,
            entries: Vec::with_capacity(outcomes.len()),
        },
        summaries: Vec::with_capacity(outcomes.len()),
    };

    for outcome in outcomes {
        log::info!(
            "Run {}: threshold {:.4} ({}% of {} reads), kept {}/{} records",
            outcome.run_id,
            outcome.threshold.threshold,
            percent,
            outcome.threshold.total_reads,
            outcome.summary.n_kept,
            outcome.summary.n_before
        );
        result.kept.insert(outcome.run_id.clone(), outcome.kept);
        result.rejected.insert(outcome.run_id, outcome.rejected);
        result.thresholds.entries.push(outcome.threshold);
        result.summaries.push(outcome.summary);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, SchemaConvention};
    use crate::filter::runs::split_runs;

    fn dataset(records: Vec<Record>) -> Dataset {
        Dataset::from_records(SchemaConvention::Alternate, records).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 10),
            Record::new("R1", "X_S1", "B", 1),
            Record::new("R1", "X_S1", "C", 100),
        ]);
        let result = apply_threshold(&split_runs(&ds).unwrap(), 5.0).unwrap();

        assert!((result.thresholds.get("R1").unwrap() - 5.55).abs() < 1e-9);
        let kept: Vec<&str> = result.kept["R1"].iter().map(|r| r.taxon.as_str()).collect();
        let rejected: Vec<&str> = result.rejected["R1"].iter().map(|r| r.taxon.as_str()).collect();
        assert_eq!(kept, vec!["A", "C"]);
        assert_eq!(rejected, vec!["B"]);
        assert_eq!(result.summaries[0].n_rejected, 1);
    }

    #[test]
    fn test_thresholds_not_pooled_across_runs() {
        // R2 alone has a tiny cutoff; pooled with R1 its record would be dropped
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 10_000),
            Record::new("R2", "X_S1", "B", 3),
            Record::new("R2", "X_S1", "C", 2),
        ]);
        let result = apply_threshold(&split_runs(&ds).unwrap(), 50.0).unwrap();
        assert!((result.thresholds.get("R2").unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(result.kept["R2"].len(), 1);
        assert_eq!(result.kept["R2"].records()[0].taxon, "B");
    }

    #[test]
    fn test_tie_is_rejected() {
        // total 20, 50% -> threshold 10; the record with exactly 10 reads is rejected
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 10),
            Record::new("R1", "X_S1", "B", 10),
        ]);
        let result = apply_threshold(&split_runs(&ds).unwrap(), 50.0).unwrap();
        assert!(result.kept["R1"].is_empty());
        assert_eq!(result.rejected["R1"].len(), 2);
    }

    #[test]
    fn test_zero_total_run() {
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 0),
            Record::new("R1", "X_S1", "B", 0),
        ]);
        let result = apply_threshold(&split_runs(&ds).unwrap(), 0.05).unwrap();
        assert_eq!(result.thresholds.get("R1"), Some(0.0));
        assert!(result.kept["R1"].is_empty());
        assert_eq!(result.summaries[0].reads_retained, 0.0);
    }

    #[test]
    fn test_zero_percent_keeps_all_nonzero() {
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 0),
            Record::new("R1", "X_S1", "B", 1),
        ]);
        let result = apply_threshold(&split_runs(&ds).unwrap(), 0.0).unwrap();
        assert_eq!(result.kept["R1"].len(), 1);
        assert_eq!(result.rejected["R1"].records()[0].taxon, "A");
    }

    #[test]
    fn test_single_record_run() {
        let ds = dataset(vec![
            Record::new("R1", "X_S1", "A", 7),
            Record::new("R2", "X_S1", "B", 0),
        ]);
        // 7 > 7 * 100 / 100 is false: a single record is rejected at 100%
        let at_full = apply_threshold(&split_runs(&ds).unwrap(), 100.0).unwrap();
        assert!(at_full.kept["R1"].is_empty());

        let at_default =
            apply_threshold(&split_runs(&ds).unwrap(), DEFAULT_THRESHOLD_PERCENT).unwrap();
        assert_eq!(at_default.kept["R1"].len(), 1);
        assert_eq!(at_default.rejected["R2"].len(), 1);
    }

    #[test]
    fn test_kept_and_rejected_reconstruct_run() {
        let records: Vec<Record> = (0..30u64)
            .map(|i| Record::new(if i % 3 == 0 { "R1" } else { "R2" }, "X_S1", &format!("t{}", i), i * i % 17))
            .collect();
        let ds = dataset(records);
        let runs = split_runs(&ds).unwrap();
        let result = apply_threshold(&runs, 4.0).unwrap();

        for (run_id, run) in runs.iter() {
            let mut original: Vec<&Record> = run.iter().collect();
            let mut rebuilt: Vec<&Record> = result.kept[run_id]
                .iter()
                .chain(result.rejected[run_id].iter())
                .collect();
            original.sort_by(|a, b| a.taxon.cmp(&b.taxon));
            rebuilt.sort_by(|a, b| a.taxon.cmp(&b.taxon));
            assert_eq!(original, rebuilt);
        }
    }

    #[test]
    fn test_monotonic_in_percent() {
        let records: Vec<Record> = (1..=20u64)
            .map(|i| Record::new("R1", "X_S1", &format!("t{}", i), i))
            .collect();
        let runs = split_runs(&dataset(records)).unwrap();
        let mut previous = usize::MAX;
        for percent in [0.5, 1.0, 2.0, 4.0, 8.0, 16.0] {
            let kept = apply_threshold(&runs, percent).unwrap().kept["R1"].len();
            assert!(kept <= previous);
            previous = kept;
        }
    }

    #[test]
    fn test_parse_threshold_percent() {
        assert_eq!(parse_threshold_percent("").unwrap(), DEFAULT_THRESHOLD_PERCENT);
        assert_eq!(parse_threshold_percent(" 0.1 ").unwrap(), 0.1);
        assert_eq!(parse_threshold_percent("0,5").unwrap(), 0.5);
        assert!(matches!(
            parse_threshold_percent("-1"),
            Err(MetabarError::InvalidThreshold(_))
        ));
        assert!(matches!(
            parse_threshold_percent("abc"),
            Err(MetabarError::InvalidThreshold(_))
        ));
        assert!(parse_threshold_percent("NaN").is_err());
    }

    #[test]
    fn test_threshold_table_render() {
        let table = ThresholdTable {
            percent: 5.0,
            entries: vec![RunThreshold {
                run_id: "R1".into(),
                total_reads: 111,
                threshold: 5.55,
            }],
        };
        let rendered = table.to_table(SchemaConvention::Alternate.labels());
        assert_eq!(rendered.headers, vec!["Run", "Total reads", "Threshold"]);
        assert_eq!(rendered.rows[0], vec!["R1", "111", "5.55"]);
    }
}
