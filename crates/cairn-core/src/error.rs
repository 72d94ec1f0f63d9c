//! Error types for the execution engine.

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of a [`CoordinatorError`].
///
/// Callers that map errors onto an outer protocol (HTTP status codes, exit
/// codes) only need to look at the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown plan or step id
    NotFound,
    /// A state, role or shape precondition was violated
    Validation,
    /// The actor lacks the required capability
    Permission,
    /// Storage or environment failure
    Internal,
}

/// Comprehensive error type for all coordinator operations.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    /// Database connection or query errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: rusqlite::Error,
    },
    /// Plan not found for the given ID
    #[error("Plan with ID {id} not found")]
    PlanNotFound { id: String },
    /// Step not found for the given ID
    #[error("Step with ID {id} not found")]
    StepNotFound { id: String },
    /// An operation is not allowed from the record's current status
    #[error("Cannot {operation} {entity} {id}: current status is {status}")]
    InvalidTransition {
        entity: &'static str,
        id: String,
        status: String,
        operation: &'static str,
    },
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// The actor lacks a capability required by the operation
    #[error("Actor '{actor}' is not allowed to {capability}")]
    PermissionDenied { actor: String, capability: String },
    /// A guarded store mutation affected no row
    #[error("Store mutation affected no row: {what}")]
    MissingRow { what: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating database errors with optional context.
pub struct DatabaseErrorBuilder {
    message: String,
}

impl DatabaseErrorBuilder {
    /// Create a new database error builder with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the error with the given source.
    pub fn with_source(self, source: rusqlite::Error) -> CoordinatorError {
        CoordinatorError::Database {
            message: self.message,
            source,
        }
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> CoordinatorError {
        CoordinatorError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl CoordinatorError {
    /// Creates a builder for database errors.
    pub fn database(message: impl Into<String>) -> DatabaseErrorBuilder {
        DatabaseErrorBuilder::new(message)
    }

    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Rejects `operation` on a plan in its current status.
    pub fn plan_transition(
        id: impl Into<String>,
        status: impl ToString,
        operation: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            entity: "plan",
            id: id.into(),
            status: status.to_string(),
            operation,
        }
    }

    /// Rejects `operation` on a step in its current status.
    pub fn step_transition(
        id: impl Into<String>,
        status: impl ToString,
        operation: &'static str,
    ) -> Self {
        Self::InvalidTransition {
            entity: "step",
            id: id.into(),
            status: status.to_string(),
            operation,
        }
    }

    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlanNotFound { .. } | Self::StepNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::InvalidInput { .. } => ErrorKind::Validation,
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::Database { .. }
            | Self::MissingRow { .. }
            | Self::FileSystem { .. }
            | Self::XdgDirectory(_)
            | Self::Serialization { .. }
            | Self::Configuration { .. } => ErrorKind::Internal,
        }
    }
}

/// Specialized extension trait for database-related Results.
pub trait DatabaseResultExt<T> {
    /// Map database errors with a message.
    fn db_context(self, message: &str) -> Result<T>;
}

impl<T> DatabaseResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn db_context(self, message: &str) -> Result<T> {
        self.map_err(|e| CoordinatorError::database(message).with_source(e))
    }
}

/// Result type alias for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;
