//! Metabarcoding survey summaries
//!
//! This library turns a table of per-sample taxon read counts into per-run
//! filtered datasets and detection/read summaries split by sampler and area.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Core data structures (Dataset, schema resolution, report tables)
//! - **filter**: Run splitting and the per-run read threshold
//! - **partition**: Splitting by sampler, by area, or both
//! - **aggregate**: Detection counts and read sums per taxon
//! - **consolidate**: Merging aggregates into final report tables
//! - **sink**: Writing named tables and workbooks
//! - **pipeline**: Pipeline composition, execution and the background worker
//!
//! # Example
//!
//! ```no_run
//! use metabar_summary::prelude::*;
//!
//! // Load data
//! let dataset = Dataset::from_csv_path("survey.csv").unwrap();
//!
//! // Run the pipeline
//! let output = Pipeline::new()
//!     .threshold_percent(Some(0.05))
//!     .samplers(&["Trap", "Net"])
//!     .by_sampler(true)
//!     .by_area(true)
//!     .aliquots(true)
//!     .run(&dataset)
//!     .unwrap();
//!
//! // Write every table
//! let mut sink = DelimitedSink::tsv("results").unwrap();
//! write_pipeline_output(&mut sink, &output, &OutputNames::default()).unwrap();
//! ```

pub mod aggregate;
pub mod consolidate;
pub mod data;
pub mod error;
pub mod filter;
pub mod partition;
pub mod pipeline;
pub mod sink;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::aggregate::{count_detections, sum_reads};
    pub use crate::consolidate::{
        concat_runs, merge_by_label, merge_final, merge_nested, sampler_overview,
        ConsolidatedReport, Consolidation, FinalTables, MergeStats, NestedFinalTables,
    };
    pub use crate::data::{
        Dataset, DetectionScope, DetectionTable, FinalRow, FinalTable, ReadSumTable, Record,
        ReportLabels, ResolvedSchema, SchemaConvention, Table, TaxonCount,
    };
    pub use crate::error::{ErrorKind, MetabarError, Result};
    pub use crate::filter::{
        apply_threshold, parse_threshold_percent, split_runs, RunFilterSummary, RunPartition,
        ThresholdResult, ThresholdTable, DEFAULT_THRESHOLD_PERCENT,
    };
    pub use crate::partition::{
        define_areas, partition_by_area, partition_by_sampler, partition_by_sampler_area,
        EmptyPartitionPolicy, MatchMode, PartitionKey, PartitionOptions,
    };
    pub use crate::pipeline::{
        JobHandle, JobOutcome, Pipeline, PipelineConfig, PipelineOutput, PipelineWorker,
        ThresholdOutput,
    };
    pub use crate::sink::{
        write_pipeline_output, write_report, write_threshold_output, DelimitedSink, OutputNames,
        ResultSink,
    };
}
