//! asn-labels.toml configuration
//!
//! Every key is optional. Paths that are not configured resolve relative to
//! the directory holding the executable, so a copied install carries its own
//! state.

use crate::models::FormatScheme;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Config file name looked up next to the executable
pub const CONFIG_FILE: &str = "asn-labels.toml";

/// State directory name under the install directory
pub const STATE_DIR: &str = "state";

/// Environment variable supplying a start ASN
pub const START_ENV_VAR: &str = "ASN_START";

/// Start used when no other source supplies one
pub const DEFAULT_START: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot resolve install directory: {0}")]
    UnresolvableLocation(String),

    #[error("ASN_START='{0}' is not a valid ASN")]
    InvalidEnvStart(String),
}

/// External renderer program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Program to run; the built-in manifest renderer is used when unset
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments; `{output}` is replaced by the artifact path
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnConfig {
    #[serde(default)]
    pub scheme: FormatScheme,

    #[serde(default = "default_start")]
    pub default_start: u32,

    /// Where artifacts are written (default: current directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Where asn_state.json lives (default: `<install>/state`)
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub renderer: RendererConfig,
}

fn default_start() -> u32 {
    DEFAULT_START
}

impl Default for AsnConfig {
    fn default() -> Self {
        Self {
            scheme: FormatScheme::default(),
            default_start: default_start(),
            output_dir: None,
            state_dir: None,
            renderer: RendererConfig::default(),
        }
    }
}

impl AsnConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configured state directory, or `<install>/state`
    pub fn resolve_state_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(install_dir()?.join(STATE_DIR)),
        }
    }

    /// Configured output directory, or the current directory
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Directory containing the running executable
pub fn install_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe()
        .map_err(|e| ConfigError::UnresolvableLocation(e.to_string()))?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::UnresolvableLocation(exe.display().to_string()))
}

/// Default config path: `<install>/asn-labels.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(install_dir()?.join(CONFIG_FILE))
}

/// Text of an `ASN_START` value as read from the environment.
///
/// Bytes that are not UTF-8 are replaced rather than dropped, so the value
/// still reaches [`parse_env_start`] and is rejected there.
pub fn env_start_value(raw: Option<OsString>) -> Option<String> {
    raw.map(|value| value.to_string_lossy().into_owned())
}

/// Parse an environment-supplied start value
pub fn parse_env_start(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvStart(raw.to_string()))
}
