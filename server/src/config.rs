//! Serving configuration
//!
//! Options can be built in code or loaded from a JSON file; missing
//! fields take their defaults.

use crate::error::{EdgeError, EdgeResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Options for `serve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeOptions {
    /// Fall through to the origin instead of failing when an error
    /// escapes the dispatcher
    #[serde(default)]
    pub pass_through_on_exception: bool,

    /// Log filter directive (trace, debug, info, warn, error, or an
    /// `EnvFilter` expression)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            pass_through_on_exception: false,
            log_level: default_log_level(),
        }
    }
}

impl ServeOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass_through_on_exception(mut self, enabled: bool) -> Self {
        self.pass_through_on_exception = enabled;
        self
    }

    pub fn log_level<S: Into<String>>(mut self, level: S) -> Self {
        self.log_level = level.into();
        self
    }

    /// Load options from a JSON file
    pub fn from_file(path: &str) -> EdgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse options from a JSON document
    pub fn from_json(content: &str) -> EdgeResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Validate options
    pub fn validate(&self) -> EdgeResult<()> {
        if self.log_level.trim().is_empty() {
            return Err(EdgeError::Config("Log level cannot be empty".to_string()));
        }
        self.log_level.parse::<EnvFilter>().map_err(|e| {
            EdgeError::Config(format!("Invalid log level '{}': {}", self.log_level, e))
        })?;
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
