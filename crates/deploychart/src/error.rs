//! Error types for deploychart.
//!
//! This module defines all error types used throughout the deploychart crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for deploychart operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// A setting needed by the requested operation is not set.
    #[error("missing setting '{name}'")]
    MissingSetting {
        /// Dotted configuration key, e.g. `quip.api_key`.
        name: &'static str,
    },

    // === Feature Errors ===
    /// A GeoJSON feature could not be accepted into the datastore.
    #[error("invalid feature '{id}': {message}")]
    InvalidFeature {
        /// Identifier of the rejected feature.
        id: String,
        /// Description of what went wrong.
        message: String,
    },

    /// GeoJSON parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(Box<geojson::Error>),

    // === Remote Service Errors ===
    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote API answered with something we cannot use.
    #[error("{service} API error: {message}")]
    Api {
        /// Name of the remote service.
        service: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === I/O Errors ===
    /// A file or directory could not be read or written.
    #[error("failed to access {path}: {source}")]
    FileAccess {
        /// Path that couldn't be accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for deploychart operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl From<geojson::Error> for Error {
    fn from(err: geojson::Error) -> Self {
        Self::GeoJson(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a remote API error.
    #[must_use]
    pub fn api(service: &'static str, message: impl Into<String>) -> Self {
        Self::Api {
            service,
            message: message.into(),
        }
    }

    /// Create an invalid feature error.
    #[must_use]
    pub fn invalid_feature(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFeature {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns.
    #[must_use]
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Check if this error is caused by a missing setting.
    #[must_use]
    pub fn is_missing_setting(&self) -> bool {
        matches!(self, Self::MissingSetting { .. })
    }

    /// Check if this error came from talking to a remote service.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }
}
