//! Running a pipeline off the caller's thread.

use super::runner::{Pipeline, PipelineOutput};
use crate::data::Dataset;
use crate::error::{ErrorKind, MetabarError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;

/// How a background job ended.
#[derive(Debug)]
pub enum JobOutcome {
    Success(Box<PipelineOutput>),
    Failure { kind: ErrorKind, message: String },
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }
}

/// Runs one pipeline at a time on the rayon pool.
#[derive(Debug, Clone, Default)]
pub struct PipelineWorker {
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the job finishes.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Turn a caught pipeline run into the outcome reported to the caller.
fn job_outcome(result: std::thread::Result<Result<PipelineOutput>>) -> JobOutcome {
    match result {
        Ok(Ok(output)) => JobOutcome::Success(Box::new(output)),
        Ok(Err(e)) => {
            log::error!("Pipeline failed: {}", e);
            JobOutcome::Failure {
                kind: e.kind(),
                message: e.to_string(),
            }
        }
        Err(payload) => {
            let message = format!("pipeline panicked: {}", panic_message(payload.as_ref()));
            log::error!("{}", message);
            JobOutcome::Failure {
                kind: ErrorKind::Pipeline,
                message,
            }
        }
    }
}

impl PipelineWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a submitted job has not finished yet.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start `pipeline` on `dataset` in the background.
    ///
    /// Fails with [`MetabarError::Busy`] while an earlier job is running.
    pub fn submit(&self, pipeline: Pipeline, dataset: Arc<Dataset>) -> Result<JobHandle> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MetabarError::Busy);
        }

        let (sender, receiver) = mpsc::channel();
        let guard = BusyGuard(Arc::clone(&self.busy));

        rayon::spawn(move || {
            let outcome = job_outcome(panic::catch_unwind(AssertUnwindSafe(|| {
                pipeline.run(&dataset)
            })));
            drop(guard);
            // The caller may have dropped its handle.
            let _ = sender.send(outcome);
        });

        Ok(JobHandle {
            receiver,
            delivered: false,
        })
    }
}

/// The caller's end of a submitted job. Delivers its outcome exactly once.
#[derive(Debug)]
pub struct JobHandle {
    receiver: Receiver<JobOutcome>,
    delivered: bool,
}

fn lost_worker() -> MetabarError {
    MetabarError::Pipeline("worker stopped without reporting an outcome".to_string())
}

impl JobHandle {
    /// Block until the job finishes.
    pub fn wait(self) -> Result<JobOutcome> {
        self.receiver.recv().map_err(|_| lost_worker())
    }

    /// Return the outcome if the job has finished.
    ///
    /// After the outcome has been returned once, later polls yield `None`.
    pub fn try_poll(&mut self) -> Result<Option<JobOutcome>> {
        if self.delivered {
            return Ok(None);
        }
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.delivered = true;
                Ok(Some(outcome))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(lost_worker()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Record, SchemaConvention};

    fn dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::from_records(
                SchemaConvention::Alternate,
                vec![
                    Record::new("R1", "AreaX_S1", "a", 100),
                    Record::new("R1", "AreaY_S1", "b", 1),
                ],
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_success_notification() {
        let worker = PipelineWorker::new();
        let handle = worker.submit(Pipeline::new(), dataset()).unwrap();
        match handle.wait().unwrap() {
            JobOutcome::Success(output) => {
                assert_eq!(output.consolidation.report.n_tables(), 1);
            }
            JobOutcome::Failure { message, .. } => panic!("job failed: {}", message),
        }
    }

    #[test]
    fn test_failure_carries_kind() {
        let worker = PipelineWorker::new();
        let pipeline = Pipeline::new().threshold_percent(Some(f64::NAN));
        match worker.submit(pipeline, dataset()).unwrap().wait().unwrap() {
            JobOutcome::Failure { kind, .. } => assert_eq!(kind, ErrorKind::InvalidThreshold),
            JobOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_panic_reported_as_pipeline_failure() {
        let caught = panic::catch_unwind(|| -> Result<PipelineOutput> { panic!("boom") });
        match job_outcome(caught) {
            JobOutcome::Failure { kind, message } => {
                assert_eq!(kind, ErrorKind::Pipeline);
                assert!(message.contains("boom"));
            }
            JobOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_busy_rejects_submission() {
        let worker = PipelineWorker::new();
        worker.busy.store(true, Ordering::Release);
        let err = worker.submit(Pipeline::new(), dataset()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Busy);
    }

    #[test]
    fn test_poll_delivers_once() {
        let worker = PipelineWorker::new();
        let mut handle = worker.submit(Pipeline::new(), dataset()).unwrap();

        let outcome = loop {
            if let Some(outcome) = handle.try_poll().unwrap() {
                break outcome;
            }
            std::thread::yield_now();
        };
        assert!(outcome.is_success());
        assert!(handle.try_poll().unwrap().is_none());
        assert!(!worker.is_busy());
    }
}
