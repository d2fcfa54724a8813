//! Error types for recipebox.
//!
//! Every fallible operation in the crate returns [`Error`]. Callers that only
//! care about the broad category (to pick a user-facing message) can match on
//! [`Error::kind`] instead of the individual variants.

use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// The record store failed to read or write.
    Persistence,
    /// A filesystem operation on image media failed.
    Io,
    /// The caller supplied malformed input.
    Validation,
    /// Configuration could not be loaded or is invalid.
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Persistence => write!(f, "persistence"),
            Self::Io => write!(f, "io"),
            Self::Validation => write!(f, "validation"),
            Self::Config => write!(f, "config"),
        }
    }
}

/// The main error type for recipebox operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Lookup Errors ===
    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        entity: &'static str,
        /// The identifier that was requested.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored list column could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Media Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an image file.
    #[error("failed to write image {path}: {source}")]
    ImageWrite {
        /// Destination of the image.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Input Errors ===
    /// Input was rejected before reaching storage.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },

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
}

/// A specialized Result type for recipebox operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a not-found error for a recipe.
    #[must_use]
    pub fn recipe_not_found(id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity: "recipe",
            id: id.to_string(),
        }
    }

    /// Create a validation error for a field.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::Json(_) => ErrorKind::Persistence,
            Self::Io(_) | Self::DirectoryCreate { .. } | Self::ImageWrite { .. } => ErrorKind::Io,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Config,
        }
    }

    /// Check if this error means the referenced record is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this error came from the record store.
    #[must_use]
    pub fn is_persistence(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }
}
