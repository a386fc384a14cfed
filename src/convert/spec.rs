//! Value types describing one encode unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Supported opus target bitrates in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Bitrate {
    Kbps320,
    Kbps160,
    Kbps80,
    Kbps40,
}

impl Bitrate {
    /// All supported bitrates, highest first.
    pub const ALL: [Bitrate; 4] = [
        Bitrate::Kbps320,
        Bitrate::Kbps160,
        Bitrate::Kbps80,
        Bitrate::Kbps40,
    ];

    pub fn kbps(self) -> u32 {
        match self {
            Bitrate::Kbps320 => 320,
            Bitrate::Kbps160 => 160,
            Bitrate::Kbps80 => 80,
            Bitrate::Kbps40 => 40,
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kbps())
    }
}

impl TryFrom<u32> for Bitrate {
    type Error = UnsupportedBitrate;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            320 => Ok(Bitrate::Kbps320),
            160 => Ok(Bitrate::Kbps160),
            80 => Ok(Bitrate::Kbps80),
            40 => Ok(Bitrate::Kbps40),
            other => Err(UnsupportedBitrate(other)),
        }
    }
}

impl From<Bitrate> for u32 {
    fn from(value: Bitrate) -> Self {
        value.kbps()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported bitrate: {0} (supported: 320, 160, 80, 40)")]
pub struct UnsupportedBitrate(pub u32);

/// Immutable description of one encoding job: one source file, one target
/// bitrate, one deterministic destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJobSpec {
    pub source: PathBuf,
    pub bitrate: Bitrate,
    pub destination: PathBuf,
}

impl EncodeJobSpec {
    /// Build a spec with the destination derived as
    /// `{output_dir}/{source base name}-{bitrate}.opus`. Distinct bitrates
    /// therefore never collide within one batch.
    pub fn new(source: &Path, bitrate: Bitrate, output_dir: &Path) -> Self {
        let base = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let destination = output_dir.join(format!("{}-{}.opus", base, bitrate.kbps()));
        Self {
            source: source.to_path_buf(),
            bitrate,
            destination,
        }
    }

    pub fn output_file_name(&self) -> String {
        self.destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
