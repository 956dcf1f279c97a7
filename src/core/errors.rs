//! TSC-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TermscopeError>;

/// Top-level error type for termscope.
#[derive(Debug, Error)]
pub enum TermscopeError {
    #[error("[TSC-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TSC-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TSC-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TSC-2001] invalid request for field {field}: {details}")]
    InvalidRequest { field: String, details: String },

    #[error("[TSC-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TSC-2102] HTTP client failure: {details}")]
    HttpClient { details: String },

    #[error("[TSC-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[TSC-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[TSC-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl TermscopeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TSC-1001",
            Self::MissingConfig { .. } => "TSC-1002",
            Self::ConfigParse { .. } => "TSC-1003",
            Self::InvalidRequest { .. } => "TSC-2001",
            Self::Serialization { .. } => "TSC-2101",
            Self::HttpClient { .. } => "TSC-2102",
            Self::Io { .. } => "TSC-3002",
            Self::ChannelClosed { .. } => "TSC-3003",
            Self::Runtime { .. } => "TSC-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for TermscopeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for TermscopeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for TermscopeError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for TermscopeError {
    fn from(value: reqwest::Error) -> Self {
        Self::HttpClient {
            details: value.to_string(),
        }
    }
}
