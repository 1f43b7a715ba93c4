//! Error types for iamdb

use thiserror::Error;

/// Result type alias for iamdb operations
pub type DbResult<T> = Result<T, DbError>;

/// Error types for statement rendering and repository operations
#[derive(Debug, Error)]
pub enum DbError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Error returned by tokio-postgres, passed through untranslated
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Error returned by a non-postgres executor
    #[error("Executor error: {0}")]
    Executor(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// More rows than the operation allows
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A JSON payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Field and array JSON operations were chained on the same column
    #[error("JSON field and array changes cannot be combined on column '{column}'")]
    MixedJsonChange { column: String },

    /// The condition does not restrict a column the operation requires
    #[error("Missing condition on column '{column}'")]
    MissingCondition { column: String },

    /// An update was requested without any change
    #[error("No changes to apply")]
    NoChanges,

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too many rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a missing condition error for a column
    pub fn missing_condition(column: impl Into<String>) -> Self {
        Self::MissingCondition {
            column: column.into(),
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a too many rows error
    pub fn is_too_many_rows(&self) -> bool {
        matches!(self, Self::TooManyRows { .. })
    }

    /// Check if this is a decode error
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
