//! Audio conversion: one uploaded source file fanned out to one opus encode
//! per configured bitrate, resolved to exactly one aggregate result.

mod batch;
mod runner;
mod spec;

pub use batch::{BatchHandle, BatchResolution, JobBatch};
pub use runner::{EncodeRunner, JobOutcome, JobStatus, OpusencRunner};
pub use spec::{Bitrate, EncodeJobSpec, UnsupportedBitrate};

use crate::config::EncoderConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no file was uploaded")]
    InputMissing,

    #[error("uploaded file is not readable: {0}")]
    InputUnreadable(String),

    #[error("encoding to {bitrate} kbps failed: {reason}")]
    EncodeProcessFailed { bitrate: u32, reason: String },

    #[error("conversion timed out after {0:?}")]
    BatchTimeout(Duration),

    #[error(transparent)]
    Config(#[from] UnsupportedBitrate),

    #[error("failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Whether the error is the caller's fault (HTTP 400) rather than an
    /// encoding or service failure (HTTP 500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConvertError::InputMissing | ConvertError::InputUnreadable(_))
    }
}

/// Result of a completed conversion request.
#[derive(Debug)]
pub struct ConversionOutput {
    pub request_id: Uuid,
    pub outputs: Vec<PathBuf>,
}

/// Validates a conversion request, fans it out over the configured bitrates
/// and translates the batch's single resolution into a response. Consumes
/// only the batch resolution event, never individual job outcomes, so one
/// request yields exactly one answer no matter how many jobs report.
pub struct ConversionService {
    runner: Arc<dyn EncodeRunner>,
    bitrates: Vec<Bitrate>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl ConversionService {
    pub fn new(config: &EncoderConfig) -> Result<Self, ConvertError> {
        let runner = Arc::new(OpusencRunner::new(&config.opusenc_path));
        Self::with_runner(runner, config)
    }

    /// Build the service around an arbitrary runner. Also the test seam.
    pub fn with_runner(
        runner: Arc<dyn EncodeRunner>,
        config: &EncoderConfig,
    ) -> Result<Self, ConvertError> {
        let bitrates = config
            .bitrates
            .iter()
            .map(|&b| Bitrate::try_from(b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            runner,
            bitrates,
            output_dir: config.output_dir.clone(),
            timeout: Duration::from_secs(config.batch_timeout_secs),
        })
    }

    /// Convert `source` to every configured bitrate.
    ///
    /// Outputs land in a per-request subdirectory of the output root, named
    /// by a fresh request id, so concurrent uploads of identically named
    /// files never collide while the `{base}-{bitrate}.opus` naming stays
    /// intact.
    pub async fn convert(&self, source: &Path) -> Result<ConversionOutput, ConvertError> {
        tokio::fs::metadata(source)
            .await
            .map_err(|e| ConvertError::InputUnreadable(e.to_string()))?;

        let request_id = Uuid::new_v4();
        let batch_dir = self.output_dir.join(request_id.to_string());
        tokio::fs::create_dir_all(&batch_dir).await?;

        let jobs: Vec<EncodeJobSpec> = self
            .bitrates
            .iter()
            .map(|&b| EncodeJobSpec::new(source, b, &batch_dir))
            .collect();

        tracing::info!(
            %request_id,
            source = %source.display(),
            jobs = jobs.len(),
            "starting conversion batch"
        );

        let handle = JobBatch::new(jobs).launch(Arc::clone(&self.runner));
        match handle.resolve(self.timeout).await {
            BatchResolution::Success { outputs } => {
                tracing::info!(%request_id, variants = outputs.len(), "conversion batch completed");
                Ok(ConversionOutput {
                    request_id,
                    outputs,
                })
            }
            BatchResolution::Failed { bitrate, reason } => {
                Err(ConvertError::EncodeProcessFailed {
                    bitrate: bitrate.kbps(),
                    reason,
                })
            }
            BatchResolution::TimedOut => Err(ConvertError::BatchTimeout(self.timeout)),
        }
    }
}
