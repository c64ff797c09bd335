use crate::{Error, error::StorageError};

/// Extension trait for Result types to simplify database error mapping
///
/// Storage backends use this to turn driver errors into syllabus storage errors
/// without repeating the same `map_err` closure on every query.
///
/// # Example
///
/// ```rust,ignore
/// use syllabus_core::error::utilities::DatabaseResultExt;
///
/// query.execute(&pool).await.map_db_err_with_context("Failed to save attempt")?;
/// ```
pub trait DatabaseResultExt<T> {
    /// Convert a database error to a storage error
    fn map_db_err(self) -> Result<T, Error>;

    /// Convert a database error to a storage error with additional context
    fn map_db_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self) -> Result<T, Error> {
        self.map_err(|e| Error::Storage(StorageError::Database(e.to_string())))
    }

    fn map_db_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| {
            tracing::error!(error = %e, context, "Database operation failed");
            Error::Storage(StorageError::Database(format!("{context}: {e}")))
        })
    }
}
