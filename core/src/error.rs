//! Error types for rowmap.

use thiserror::Error;

/// Boxed error kept as the cause of a backend failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum RowmapError {
    /// Metadata or builder input is structurally invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A property path could not be resolved.
    #[error("Invalid property path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// Operation attempted on a committed or rolled back transaction.
    #[error("Transaction (id: {id}) is no longer active, and can no longer be used")]
    InactiveTransaction { id: String },

    /// Failure reported by the storage backend, passed through unchanged.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A composite property value could not be rendered as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RowmapError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a backend error without an underlying cause.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a backend error, keeping it as the source.
    pub fn database_source<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Database {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// True for errors raised while building metadata or compiling builders.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidPath { .. })
    }

    pub fn is_inactive_transaction(&self) -> bool {
        matches!(self, Self::InactiveTransaction { .. })
    }
}

/// Result type alias for rowmap operations.
pub type RowmapResult<T> = Result<T, RowmapError>;
