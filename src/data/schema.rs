//! Column-naming conventions and their resolution onto canonical fields.
//!
//! Survey spreadsheets have been produced under several historical header
//! vocabularies. Resolution happens once, here; everything downstream works
//! on [`ResolvedSchema`] column positions and never inspects header names.

use crate::error::{MetabarError, Result};
use serde::{Deserialize, Serialize};

/// A supported header vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaConvention {
    /// `Corrida`, `Amostra`, `Ponto`, `OTUFinal`, `N_reads`.
    Primary,
    /// `Run`, `Sample`, `Point`, `FinalOTU`, `N_reads`.
    Alternate,
    /// `run_id`, `sample_id`, `point_id`, `taxon`, `read_count`.
    Canonical,
}

/// Header names of one convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnNames {
    pub run: &'static str,
    pub sample: &'static str,
    pub point: &'static str,
    pub taxon: &'static str,
    pub reads: &'static str,
}

/// What a detection column counts over, used to build its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionScope<'a> {
    Overall,
    /// `per_point` marks counts deduplicated by sub-sample point.
    Sampler { sampler: &'a str, per_point: bool },
    Area(&'a str),
}

/// Report headers written for a convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLabels {
    convention: SchemaConvention,
}

impl SchemaConvention {
    /// Order in which conventions are tried.
    pub const PRECEDENCE: [SchemaConvention; 3] = [
        SchemaConvention::Primary,
        SchemaConvention::Alternate,
        SchemaConvention::Canonical,
    ];

    pub fn column_names(&self) -> ColumnNames {
        match self {
            SchemaConvention::Primary => ColumnNames {
                run: "Corrida",
                sample: "Amostra",
                point: "Ponto",
                taxon: "OTUFinal",
                reads: "N_reads",
            },
            SchemaConvention::Alternate => ColumnNames {
                run: "Run",
                sample: "Sample",
                point: "Point",
                taxon: "FinalOTU",
                reads: "N_reads",
            },
            SchemaConvention::Canonical => ColumnNames {
                run: "run_id",
                sample: "sample_id",
                point: "point_id",
                taxon: "taxon",
                reads: "read_count",
            },
        }
    }

    pub fn labels(&self) -> ReportLabels {
        ReportLabels { convention: *self }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SchemaConvention::Primary => "primary",
            SchemaConvention::Alternate => "alternate",
            SchemaConvention::Canonical => "canonical",
        }
    }
}

impl ReportLabels {
    pub fn taxon(&self) -> &'static str {
        match self.convention {
            SchemaConvention::Primary => "Táxon",
            SchemaConvention::Alternate => "Taxon",
            SchemaConvention::Canonical => "taxon",
        }
    }

    pub fn reads(&self) -> &'static str {
        match self.convention {
            SchemaConvention::Primary | SchemaConvention::Alternate => "Reads",
            SchemaConvention::Canonical => "reads",
        }
    }

    pub fn run(&self) -> &'static str {
        self.convention.column_names().run
    }

    pub fn total_reads(&self) -> &'static str {
        match self.convention {
            SchemaConvention::Primary => "Reads totais",
            SchemaConvention::Alternate => "Total reads",
            SchemaConvention::Canonical => "total_reads",
        }
    }

    pub fn threshold(&self) -> &'static str {
        match self.convention {
            SchemaConvention::Primary | SchemaConvention::Alternate => "Threshold",
            SchemaConvention::Canonical => "threshold",
        }
    }

    /// Header of a detection-count column.
    pub fn detections(&self, scope: DetectionScope<'_>) -> String {
        match (self.convention, scope) {
            (SchemaConvention::Primary, DetectionScope::Overall) => "Detecções".to_string(),
            (SchemaConvention::Primary, DetectionScope::Sampler { sampler, per_point: true }) => {
                format!("Detecções por {}", sampler)
            }
            (SchemaConvention::Primary, DetectionScope::Sampler { sampler, per_point: false }) => {
                format!("Detecções com {}", sampler)
            }
            (SchemaConvention::Primary, DetectionScope::Area(a)) => format!("Detecções em {}", a),
            (SchemaConvention::Alternate, DetectionScope::Overall) => "Detections".to_string(),
            (SchemaConvention::Alternate, DetectionScope::Sampler { sampler, .. }) => {
                format!("Detections by {}", sampler)
            }
            (SchemaConvention::Alternate, DetectionScope::Area(a)) => format!("Detections in {}", a),
            (SchemaConvention::Canonical, DetectionScope::Overall) => "detections".to_string(),
            (SchemaConvention::Canonical, DetectionScope::Sampler { sampler, .. }) => {
                format!("detections_by_{}", sampler)
            }
            (SchemaConvention::Canonical, DetectionScope::Area(a)) => format!("detections_in_{}", a),
        }
    }
}

/// Column positions of the canonical fields within a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub convention: SchemaConvention,
    pub run: Option<usize>,
    pub sample: usize,
    pub point: Option<usize>,
    pub taxon: usize,
    pub reads: usize,
}

impl ResolvedSchema {
    pub fn has_points(&self) -> bool {
        self.point.is_some()
    }

    pub fn labels(&self) -> ReportLabels {
        self.convention.labels()
    }
}

fn position(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
}

/// Resolve a header row against the supported conventions.
///
/// Conventions are tried in [`SchemaConvention::PRECEDENCE`] order; the first
/// one whose sample, taxon and read-count columns are all present wins. Run
/// and point columns are optional at this stage.
pub fn resolve_schema(headers: &[String]) -> Result<ResolvedSchema> {
    for convention in SchemaConvention::PRECEDENCE {
        let names = convention.column_names();
        let sample = position(headers, names.sample);
        let taxon = position(headers, names.taxon);
        let reads = position(headers, names.reads);

        if let (Some(sample), Some(taxon), Some(reads)) = (sample, taxon, reads) {
            return Ok(ResolvedSchema {
                convention,
                run: position(headers, names.run),
                sample,
                point: position(headers, names.point),
                taxon,
                reads,
            });
        }
    }

    Err(MetabarError::Schema(format!(
        "no supported column convention found in header [{}]",
        headers.join(", ")
    )))
}
