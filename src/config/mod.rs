mod types;

pub use types::*;

use crate::convert::Bitrate;
use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./opusrack.toml",
        "~/.config/opusrack/config.toml",
        "/etc/opusrack/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.encoder.bitrates.is_empty() {
        anyhow::bail!("At least one target bitrate must be configured");
    }

    for &bitrate in &config.encoder.bitrates {
        Bitrate::try_from(bitrate)
            .with_context(|| format!("Invalid bitrate in [encoder] config: {}", bitrate))?;
    }

    if config.server.auth.enabled
        && config
            .server
            .auth
            .api_token
            .as_deref()
            .map_or(true, str::is_empty)
    {
        anyhow::bail!("Auth is enabled but no api_token is configured");
    }

    if config.store.enabled && config.store.url.is_empty() {
        anyhow::bail!("Store is enabled but has no url");
    }

    Ok(())
}
