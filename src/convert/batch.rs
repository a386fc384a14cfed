//! Fan-out/join coordination for one batch of encode jobs.
//!
//! All jobs of a batch run concurrently; their outcome reports are funneled
//! through a single mpsc channel into one coordinator task, so the
//! "deciding report" check is never raced. The aggregate result is delivered
//! through a one-shot channel whose sender is taken exactly once: the first
//! observed failure resolves the batch, otherwise the final (Nth) success
//! does. Outcomes arriving after resolution are recorded for diagnostics and
//! their output files discarded; they can never re-trigger or flip a
//! resolution.

use super::runner::{EncodeRunner, JobOutcome, JobStatus};
use super::spec::{Bitrate, EncodeJobSpec};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One-time aggregate result of a batch. Terminal; there is no partial
/// success state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResolution {
    /// Every job reported success. Outputs are listed in completion order.
    Success { outputs: Vec<PathBuf> },
    /// At least one job failed; the first observed failure wins. Which
    /// failure is observed first under concurrent failures depends on
    /// scheduler order and is not deterministic.
    Failed { bitrate: Bitrate, reason: String },
    /// The batch deadline elapsed before resolution; outstanding jobs are
    /// abandoned and their outcomes discarded.
    TimedOut,
}

/// A fixed set of encode jobs derived from one source file.
#[derive(Debug)]
pub struct JobBatch {
    jobs: Vec<EncodeJobSpec>,
}

impl JobBatch {
    pub fn new(jobs: Vec<EncodeJobSpec>) -> Self {
        Self { jobs }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Launch every job concurrently and return a handle to the batch's
    /// single resolution event. No job waits on another.
    pub fn launch(self, runner: Arc<dyn EncodeRunner>) -> BatchHandle {
        let total = self.jobs.len();
        let (outcome_tx, outcome_rx) = mpsc::channel(total.max(1));
        let (resolution_tx, resolution_rx) = oneshot::channel();

        for spec in self.jobs {
            let runner = Arc::clone(&runner);
            let tx = outcome_tx.clone();
            tokio::spawn(async move {
                let outcome = runner.run(spec).await;
                // The coordinator is gone once the batch deadline elapsed;
                // outcomes of abandoned jobs are simply dropped.
                let _ = tx.send(outcome).await;
            });
        }
        drop(outcome_tx);

        tokio::spawn(coordinate(total, outcome_rx, resolution_tx));

        BatchHandle {
            resolution: resolution_rx,
        }
    }
}

/// Handle to a launched batch. Consuming it is the only way to observe the
/// resolution, which therefore reaches the caller at most once.
pub struct BatchHandle {
    resolution: oneshot::Receiver<BatchResolution>,
}

impl BatchHandle {
    /// Wait for the batch to resolve, up to `deadline`.
    pub async fn resolve(self, deadline: Duration) -> BatchResolution {
        match tokio::time::timeout(deadline, self.resolution).await {
            Ok(Ok(resolution)) => resolution,
            Ok(Err(_)) => {
                // The coordinator always resolves before exiting; a closed
                // channel means its task was torn down with the runtime.
                tracing::error!("batch coordinator dropped without resolving");
                BatchResolution::TimedOut
            }
            Err(_) => {
                tracing::warn!(?deadline, "batch deadline elapsed, abandoning outstanding jobs");
                BatchResolution::TimedOut
            }
        }
    }
}

/// Single-writer loop that serializes all outcome reports for one batch.
async fn coordinate(
    total: usize,
    mut outcome_rx: mpsc::Receiver<JobOutcome>,
    resolution_tx: oneshot::Sender<BatchResolution>,
) {
    let mut resolution_tx = Some(resolution_tx);
    let mut outcomes: Vec<JobOutcome> = Vec::with_capacity(total);

    while let Some(outcome) = outcome_rx.recv().await {
        match &outcome.status {
            JobStatus::Failed(reason) => {
                if let Some(tx) = resolution_tx.take() {
                    tracing::warn!(
                        bitrate = %outcome.spec.bitrate,
                        reason = %reason,
                        "encode job failed, resolving batch as failed"
                    );
                    let _ = tx.send(BatchResolution::Failed {
                        bitrate: outcome.spec.bitrate,
                        reason: reason.clone(),
                    });
                } else {
                    tracing::debug!(
                        bitrate = %outcome.spec.bitrate,
                        reason = %reason,
                        "failure reported after batch resolution"
                    );
                }
                discard_output(&outcome.spec.destination).await;
            }
            JobStatus::Success => {
                if resolution_tx.is_some() {
                    tracing::debug!(bitrate = %outcome.spec.bitrate, "encode job completed");
                } else {
                    tracing::debug!(
                        bitrate = %outcome.spec.bitrate,
                        "success reported after batch resolution, discarding output"
                    );
                    discard_output(&outcome.spec.destination).await;
                }
            }
        }

        outcomes.push(outcome);
        if outcomes.len() == total {
            break;
        }
    }

    // Any failure takes the sender immediately, so reaching this point with
    // the sender intact means every job reported success.
    if let Some(tx) = resolution_tx.take() {
        let outputs = outcomes
            .iter()
            .map(|o| o.spec.destination.clone())
            .collect();
        let _ = tx.send(BatchResolution::Success { outputs });
    }
}

/// Best-effort removal of an output file that must not be used. Not required
/// for correctness: callers treat the paths of failed or discarded jobs as
/// unusable either way.
async fn discard_output(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "could not remove discarded output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::runner::OpusencRunner;

    #[tokio::test]
    async fn empty_batch_resolves_success_immediately() {
        let runner: Arc<dyn EncodeRunner> = Arc::new(OpusencRunner::new("opusenc"));
        let handle = JobBatch::new(Vec::new()).launch(runner);
        let resolution = handle.resolve(Duration::from_secs(1)).await;
        assert_eq!(resolution, BatchResolution::Success { outputs: vec![] });
    }
}
