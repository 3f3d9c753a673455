//! Pipeline configuration and execution.

use crate::aggregate::{
    count_detections, count_detections_by, count_detections_nested, sum_reads, sum_reads_by,
    sum_reads_nested,
};
use crate::consolidate::{
    concat_runs, merge_by_label, merge_final, merge_nested, sampler_overview, ConsolidatedReport,
    Consolidation, MergeStats,
};
use crate::data::{Dataset, DetectionScope, ReportLabels, Table};
use crate::error::{MetabarError, Result};
use crate::filter::{
    apply_threshold, split_runs, validate_threshold_percent, RunFilterSummary, ThresholdTable,
    DEFAULT_THRESHOLD_PERCENT,
};
use crate::partition::{
    define_areas, partition_by_area, partition_by_sampler, split_samplers_by_area,
    validate_sampler_labels, EmptyPartitionPolicy, MatchMode, PartitionKey, PartitionOptions,
};
use serde::{Deserialize, Serialize};

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Percentage of a run's total reads used as its cutoff.
    pub threshold_percent: Option<f64>,
    /// Run the per-run threshold before consolidating.
    pub apply_threshold: bool,
    /// Ordered sampler labels.
    pub sampler_labels: Vec<String>,
    pub by_sampler: bool,
    pub by_area: bool,
    /// Count detections once per sub-sample point.
    pub aliquot_mode: bool,
    pub match_mode: MatchMode,
    pub empty_partitions: EmptyPartitionPolicy,
    /// Separator between area and sampler in a sample identifier.
    pub area_delimiter: char,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "metabar".to_string(),
            threshold_percent: Some(DEFAULT_THRESHOLD_PERCENT),
            apply_threshold: true,
            sampler_labels: Vec::new(),
            by_sampler: false,
            by_area: false,
            aliquot_mode: false,
            match_mode: MatchMode::default(),
            empty_partitions: EmptyPartitionPolicy::default(),
            area_delimiter: '_',
        }
    }
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MetabarError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(MetabarError::from)
    }
}

/// Kept and rejected records of the threshold step, re-assembled across runs.
#[derive(Debug, Clone)]
pub struct ThresholdOutput {
    pub kept: Dataset,
    pub rejected: Dataset,
    pub thresholds: ThresholdTable,
    pub summaries: Vec<RunFilterSummary>,
    pub labels: ReportLabels,
}

impl ThresholdOutput {
    /// The per-run cutoffs rendered with the input's vocabulary.
    pub fn threshold_table(&self) -> Table {
        self.thresholds.to_table(self.labels)
    }
}

/// Everything one pipeline invocation produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub name: String,
    /// Absent when the threshold step was disabled.
    pub threshold: Option<ThresholdOutput>,
    pub consolidation: Consolidation,
}

impl std::fmt::Display for PipelineOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Pipeline: {}", self.name)?;
        if let Some(threshold) = &self.threshold {
            writeln!(f, "Threshold: {}%", threshold.thresholds.percent)?;
            writeln!(
                f,
                "  {} records kept, {} rejected over {} runs",
                threshold.kept.len(),
                threshold.rejected.len(),
                threshold.thresholds.len()
            )?;
        }
        writeln!(f, "Report: {:?}", self.consolidation.report.key())?;
        writeln!(f, "  Final tables: {}", self.consolidation.report.n_tables())?;
        writeln!(f, "  {}", self.consolidation.stats)?;
        Ok(())
    }
}

/// Builder for constructing and running the survey pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a pipeline with default settings.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Convert to config for serialization.
    pub fn to_config(&self) -> PipelineConfig {
        self.config.clone()
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_string();
        self
    }

    /// Set the threshold percentage; `None` falls back to the default.
    pub fn threshold_percent(mut self, percent: Option<f64>) -> Self {
        self.config.threshold_percent = percent;
        self
    }

    /// Enable or disable the threshold step.
    pub fn apply_threshold(mut self, enabled: bool) -> Self {
        self.config.apply_threshold = enabled;
        self
    }

    /// Set the ordered sampler labels.
    pub fn samplers<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.config.sampler_labels = labels.iter().map(|l| l.as_ref().to_string()).collect();
        self
    }

    pub fn by_sampler(mut self, enabled: bool) -> Self {
        self.config.by_sampler = enabled;
        self
    }

    pub fn by_area(mut self, enabled: bool) -> Self {
        self.config.by_area = enabled;
        self
    }

    /// Count a taxon at most once per point.
    pub fn aliquots(mut self, enabled: bool) -> Self {
        self.config.aliquot_mode = enabled;
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.config.match_mode = mode;
        self
    }

    pub fn empty_partitions(mut self, policy: EmptyPartitionPolicy) -> Self {
        self.config.empty_partitions = policy;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.config.area_delimiter = delimiter;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Which dimensions the report is split along.
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::from_flags(self.config.by_sampler, self.config.by_area)
    }

    fn partition_options(&self) -> PartitionOptions {
        PartitionOptions {
            match_mode: self.config.match_mode,
            empty_partitions: self.config.empty_partitions,
            delimiter: self.config.area_delimiter,
        }
    }

    fn percent(&self) -> Result<f64> {
        validate_threshold_percent(
            self.config
                .threshold_percent
                .unwrap_or(DEFAULT_THRESHOLD_PERCENT),
        )
    }

    /// Check the settings before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if self.config.apply_threshold {
            self.percent()?;
        }
        if self.partition_key().uses_samplers() {
            validate_sampler_labels(&self.config.sampler_labels)?;
        }
        Ok(())
    }

    /// Split into runs and apply the per-run threshold.
    pub fn run_threshold(&self, dataset: &Dataset) -> Result<ThresholdOutput> {
        let percent = self.percent()?;
        let runs = split_runs(dataset)?;
        let result = apply_threshold(&runs, percent)?;

        let kept = concat_runs(dataset, &result.kept)?;
        let rejected = concat_runs(dataset, &result.rejected)?;
        log::info!(
            "Threshold {}%: kept {} of {} records",
            percent,
            kept.len(),
            dataset.len()
        );

        Ok(ThresholdOutput {
            kept,
            rejected,
            thresholds: result.thresholds,
            summaries: result.summaries,
            labels: dataset.schema().labels(),
        })
    }

    /// Partition, aggregate and merge into final report tables.
    pub fn run_consolidation(&self, dataset: &Dataset) -> Result<Consolidation> {
        let key = self.partition_key();
        if key.uses_samplers() {
            validate_sampler_labels(&self.config.sampler_labels)?;
        }

        let options = self.partition_options();
        let labels = dataset.schema().labels();
        let aliquots = self.config.aliquot_mode;
        let samplers = &self.config.sampler_labels;
        let per_point = aliquots && dataset.schema().has_points();

        let consolidation = match key {
            PartitionKey::Overall => {
                let table = merge_final(
                    &count_detections(dataset, aliquots),
                    &sum_reads(dataset),
                    labels,
                    DetectionScope::Overall,
                );
                Consolidation {
                    report: ConsolidatedReport::Overall(table),
                    stats: MergeStats {
                        merged: 1,
                        skipped: 0,
                    },
                }
            }
            PartitionKey::Sampler => {
                let partitions = partition_by_sampler(dataset, samplers, &options)?;
                let (tables, stats) = merge_by_label(
                    &count_detections_by(&partitions, aliquots),
                    &sum_reads_by(&partitions),
                    labels,
                    |label| DetectionScope::Sampler {
                        sampler: label,
                        per_point,
                    },
                );
                Consolidation {
                    report: ConsolidatedReport::BySampler(tables),
                    stats,
                }
            }
            PartitionKey::Area => {
                let areas = define_areas(dataset, options.delimiter);
                let partitions = partition_by_area(dataset, &areas, &options);
                let (tables, stats) = merge_by_label(
                    &count_detections_by(&partitions, aliquots),
                    &sum_reads_by(&partitions),
                    labels,
                    |label| DetectionScope::Area(label),
                );
                Consolidation {
                    report: ConsolidatedReport::ByArea(tables),
                    stats,
                }
            }
            PartitionKey::SamplerArea => {
                let areas = define_areas(dataset, options.delimiter);
                let by_sampler = partition_by_sampler(dataset, samplers, &options)?;
                let nested = split_samplers_by_area(&by_sampler, &areas, &options);
                let (tables, stats) = merge_nested(
                    &count_detections_nested(&nested, aliquots),
                    &sum_reads_nested(&nested),
                    labels,
                );
                let overview = sampler_overview(&by_sampler, labels);
                Consolidation {
                    report: ConsolidatedReport::BySamplerArea { overview, tables },
                    stats,
                }
            }
        };

        log::info!(
            "Consolidated {} final tables ({})",
            consolidation.report.n_tables(),
            consolidation.stats
        );
        Ok(consolidation)
    }

    /// Run the pipeline on a dataset.
    ///
    /// Nothing is written here; a failure leaves no partial output behind.
    pub fn run(&self, dataset: &Dataset) -> Result<PipelineOutput> {
        self.validate()?;

        let threshold = if self.config.apply_threshold {
            Some(self.run_threshold(dataset)?)
        } else {
            None
        };
        let filtered = threshold.as_ref().map(|t| &t.kept).unwrap_or(dataset);
        let consolidation = self.run_consolidation(filtered)?;

        Ok(PipelineOutput {
            name: self.config.name.clone(),
            threshold,
            consolidation,
        })
    }
}
