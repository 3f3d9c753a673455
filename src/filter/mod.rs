//! Run splitting and read-abundance threshold filtering.

pub mod runs;
pub mod threshold;

pub use runs::{split_runs, RunPartition};
pub use threshold::{
    apply_threshold, parse_threshold_percent, threshold_value, validate_threshold_percent,
    RunFilterSummary, RunThreshold, ThresholdResult, ThresholdTable, DEFAULT_THRESHOLD_PERCENT,
};
