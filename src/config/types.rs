use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted upload size in bytes (default: 512 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Require a bearer token on the API routes
    #[serde(default)]
    pub enabled: bool,

    /// API token clients must present (generate with `opusrack generate-token`)
    #[serde(default)]
    pub api_token: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_upload_bytes() -> usize {
    512 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            auth: AuthConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Path to the opusenc binary
    #[serde(default = "default_opusenc_path")]
    pub opusenc_path: PathBuf,

    /// Target bitrates in kbit/s; one output variant is produced per entry
    #[serde(default = "default_bitrates")]
    pub bitrates: Vec<u32>,

    /// Root directory for produced variants, served read-only at /output
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Staging directory for uploads awaiting encoding
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Overall deadline for one conversion batch in seconds (default: 300)
    #[serde(default = "default_batch_timeout")]
    pub batch_timeout_secs: u64,
}

fn default_opusenc_path() -> PathBuf {
    PathBuf::from("opusenc")
}

fn default_bitrates() -> Vec<u32> {
    vec![320, 160, 80, 40]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_batch_timeout() -> u64 {
    300
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            opusenc_path: default_opusenc_path(),
            bitrates: default_bitrates(),
            output_dir: default_output_dir(),
            work_dir: default_work_dir(),
            batch_timeout_secs: default_batch_timeout(),
        }
    }
}

/// Connection details for the blob-store / account service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Enable the /upload, /register and /login routes
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of the store API
    #[serde(default)]
    pub url: String,

    /// Token for file uploads
    #[serde(default)]
    pub auth_token: String,

    /// Token for the admin account endpoints
    #[serde(default)]
    pub admin_token: String,
}
