//! Error taxonomy for the lookup client
//!
//! Search and scoring failures are kept apart so that one never clears the
//! other's state. A superseded response is not an error at all; orchestrators
//! report it as a `Stale` outcome instead.

use thiserror::Error;

/// Longest response body excerpt carried inside a status error
const BODY_EXCERPT_LEN: usize = 200;

/// Lookup service failure
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("lookup request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("lookup service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("lookup response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid lookup url: {0}")]
    Url(#[from] url::ParseError),
}

/// Scoring service failure
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("scoring request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("scoring service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("assessment could not be decoded: {0}")]
    Decode(String),

    #[error("invalid scoring url: {0}")]
    Url(#[from] url::ParseError),

    #[error("assessment is for {received}, expected {expected}")]
    SubjectMismatch { expected: String, received: String },
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration value for {field}: {message}")]
    Invalid { field: &'static str, message: String },

    #[error("failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Truncate a response body for inclusion in an error message
pub(crate) fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
