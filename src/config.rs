//! Engine configuration
//!
//! Loaded from a JSON file. Every key is optional; missing keys take the
//! defaults below.
//!
//! ```json
//! {
//!   "host": "0.0.0.0",
//!   "port": 54321,
//!   "default_limit": 50,
//!   "default_order_by": "created_at",
//!   "audit_log_path": "./changelog.jsonl"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifier::validate_identifier;
use crate::query::{QueryDefaults, DEFAULT_LIMIT, DEFAULT_ORDER_BY, MAX_LIMIT};
use crate::schema::DEFAULT_REGEX_SIZE_LIMIT;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine and server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 54321)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Page size when a request omits `limit` (1..=100)
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    /// Sort key when a request omits `orderBy`
    #[serde(default = "default_order_by")]
    pub default_order_by: String,

    /// Compiled-size ceiling for field `pattern` regexes, in bytes
    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    /// Changelog file; in-memory changelog when unset
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    54321
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn default_order_by() -> String {
    DEFAULT_ORDER_BY.to_string()
}

fn default_regex_size_limit() -> usize {
    DEFAULT_REGEX_SIZE_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            default_limit: default_limit(),
            default_order_by: default_order_by(),
            regex_size_limit: default_regex_size_limit(),
            audit_log_path: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_LIMIT).contains(&self.default_limit) {
            return Err(ConfigError::Invalid(format!(
                "default_limit must be between 1 and {}, got {}",
                MAX_LIMIT, self.default_limit
            )));
        }

        if !validate_identifier(&self.default_order_by) {
            return Err(ConfigError::Invalid(format!(
                "default_order_by '{}' is not a valid identifier",
                self.default_order_by
            )));
        }

        if self.regex_size_limit == 0 {
            return Err(ConfigError::Invalid("regex_size_limit must be > 0".into()));
        }

        Ok(())
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Query defaults derived from this configuration
    pub fn query_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            limit: self.default_limit,
            order_by: self.default_order_by.clone(),
        }
    }
}
