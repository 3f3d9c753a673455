//! Partitioning by sampler label.

use super::{MatchMode, PartitionOptions, Partitions};
use crate::data::Dataset;
use crate::error::{MetabarError, Result};
use std::collections::HashSet;

/// Clean a caller-supplied sampler list.
///
/// Labels are trimmed and blank entries dropped (a trailing newline in a
/// one-per-line list is common). Duplicates are rejected since they would
/// produce two partitions with the same key.
pub fn validate_sampler_labels<S: AsRef<str>>(labels: &[S]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(labels.len());

    for label in labels {
        let label = label.as_ref().trim();
        if label.is_empty() {
            continue;
        }
        if !seen.insert(label.to_string()) {
            return Err(MetabarError::InvalidParameter(format!(
                "Duplicate sampler label '{}'",
                label
            )));
        }
        cleaned.push(label.to_string());
    }

    if cleaned.is_empty() {
        return Err(MetabarError::InvalidParameter(
            "Sampler partitioning requires at least one sampler label".to_string(),
        ));
    }
    Ok(cleaned)
}

/// Whether a sample identifier belongs to a sampler.
pub fn sample_matches_sampler(sample_id: &str, label: &str, options: &PartitionOptions) -> bool {
    match options.match_mode {
        MatchMode::Substring => sample_id.contains(label),
        MatchMode::ExactToken => sample_id.split(options.delimiter).any(|token| token == label),
    }
}

/// Split a dataset into one sub-dataset per sampler label, in label order.
pub fn partition_by_sampler<S: AsRef<str>>(
    dataset: &Dataset,
    labels: &[S],
    options: &PartitionOptions,
) -> Result<Partitions> {
    let labels = validate_sampler_labels(labels)?;
    let mut partitions = Partitions::with_capacity(labels.len());

    for label in labels {
        let subset = dataset.filter(|r| sample_matches_sampler(&r.sample_id, &label, options));
        if options.keeps(&subset, &label) {
            partitions.insert(label, subset);
        }
    }

    log::info!(
        "Partitioned {} records into {} sampler groups",
        dataset.len(),
        partitions.len()
    );
    Ok(partitions)
}
