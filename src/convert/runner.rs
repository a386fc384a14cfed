//! External encoder invocation.

use super::spec::EncodeJobSpec;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Terminal result of one encode job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Success,
    Failed(String),
}

/// Created exactly once per job, when its external process terminates.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub spec: EncodeJobSpec,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn success(spec: EncodeJobSpec) -> Self {
        Self {
            spec,
            status: JobStatus::Success,
        }
    }

    pub fn failed(spec: EncodeJobSpec, reason: impl Into<String>) -> Self {
        Self {
            spec,
            status: JobStatus::Failed(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Success
    }
}

/// Runs one encoding invocation and reports the outcome.
///
/// Implementations never return an error past this boundary: process launch
/// failures, nonzero exits and I/O problems are all folded into a `Failed`
/// outcome. A `Failed` outcome's destination is unusable even if a partial
/// file exists on disk.
#[async_trait]
pub trait EncodeRunner: Send + Sync {
    async fn run(&self, spec: EncodeJobSpec) -> JobOutcome;
}

/// Runner backed by the `opusenc` command line encoder.
#[derive(Debug, Clone)]
pub struct OpusencRunner {
    binary: PathBuf,
}

impl OpusencRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl EncodeRunner for OpusencRunner {
    async fn run(&self, spec: EncodeJobSpec) -> JobOutcome {
        tracing::debug!(
            bitrate = %spec.bitrate,
            source = %spec.source.display(),
            destination = %spec.destination.display(),
            "launching opusenc"
        );

        let output = Command::new(&self.binary)
            .arg("--bitrate")
            .arg(spec.bitrate.kbps().to_string())
            .arg(&spec.source)
            .arg(&spec.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => JobOutcome::success(spec),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                let detail = stderr.lines().last().unwrap_or("").trim().to_string();
                let reason = match out.status.code() {
                    Some(code) => format!("opusenc exited with status {}: {}", code, detail),
                    None => format!("opusenc terminated by signal: {}", detail),
                };
                JobOutcome::failed(spec, reason)
            }
            Err(e) => JobOutcome::failed(spec, format!("failed to launch opusenc: {}", e)),
        }
    }
}
