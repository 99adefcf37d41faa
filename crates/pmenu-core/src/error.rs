#![forbid(unsafe_code)]

//! Error types for rule compilation and override parsing.
//!
//! Neither error is ever fatal for a page load: callers log them and fall
//! back to the documented defaults.

use thiserror::Error;

/// A host rule could not be built.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid host pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex_lite::Error,
    },
}

/// Runtime overrides or a configuration value could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse menu overrides JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown {kind} `{value}`")]
    UnknownValue { kind: &'static str, value: String },
}
