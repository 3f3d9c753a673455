//! Pipeline composition and execution for survey summaries.

mod runner;
mod worker;

pub use runner::{Pipeline, PipelineConfig, PipelineOutput, ThresholdOutput};
pub use worker::{JobHandle, JobOutcome, PipelineWorker};
