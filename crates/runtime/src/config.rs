//! Bridge configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use itembridge_runtime::{BridgeConfig, CaseMode};
//!
//! let config = BridgeConfig::new()
//!     .with_max_call_depth(64)
//!     .with_symbol_case(CaseMode::Exact)
//!     .with_log_dir("/var/log/app");
//!
//! // or from a TOML file
//! let config = BridgeConfig::load("itembridge.toml")?;
//! ```
//!
//! TOML keys mirror the field names; every key is optional:
//!
//! ```toml
//! max_call_depth = 64
//! symbol_case = "exact"
//! log_newline = "\r\n"
//! log_dir = "logs"
//! ```

use crate::symbol::CaseMode;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Deepest allowed nesting of invocations
    pub max_call_depth: usize,

    /// Lookup mode for name-based calls (`call_if_present`, the CLI)
    pub symbol_case: CaseMode,

    /// Terminator appended to every log record
    pub log_newline: String,

    /// Base directory for relative log paths
    pub log_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            symbol_case: CaseMode::Insensitive,
            log_newline: "\n".to_string(),
            log_dir: None,
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        BridgeConfig::default()
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_symbol_case(mut self, mode: CaseMode) -> Self {
        self.symbol_case = mode;
        self
    }

    pub fn with_log_newline(mut self, newline: impl Into<String>) -> Self {
        self.log_newline = newline.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "invalid config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}
