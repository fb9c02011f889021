//! Storage error types.

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to initialize the storage backend.
    #[error("storage initialization failed: {0}")]
    Init(String),

    /// File or object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Permission denied.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The configured backend cannot perform the operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StorageError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a new not found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Returns `true` if the object does not exist.
    ///
    /// Callers implementing cache-aside lookups treat this as a miss rather
    /// than a failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let err = StorageError::not_found("org/repo/sha/grader.tgz");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("grader.tgz"));
    }

    #[test]
    fn opendal_kinds_are_mapped() {
        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::NotFound, "missing").into();
        assert!(err.is_not_found());

        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::Unsupported, "presign").into();
        assert!(matches!(err, StorageError::Unsupported(_)));

        let err: StorageError =
            opendal::Error::new(opendal::ErrorKind::Unexpected, "boom").into();
        assert!(matches!(err, StorageError::Backend(_)));
    }
}
