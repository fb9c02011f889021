//! Structured error handling for GitHub operations.

use std::borrow::Cow;

use pawtograder_opendal::StorageError;
use reqwest::StatusCode;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in GitHub operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input validation failed.
    InvalidInput,
    /// Token or credential was rejected.
    Authentication,
    /// Caller is authenticated but not allowed.
    Authorization,
    /// Resource not found.
    NotFound,
    /// Network-related error occurred.
    NetworkError,
    /// The GitHub API answered with an unexpected status.
    ExternalError,
    /// Object storage failed.
    Storage,
    /// Configuration error.
    Configuration,
    /// Serialization/deserialization error.
    Serialization,
    /// Unknown error occurred.
    #[default]
    Unknown,
}

/// Structured error type with classification and context tracking.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<Cow<'static, str>>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
    /// Additional context information.
    pub context: Option<Cow<'static, str>>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
            context: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds context to the error.
    pub fn with_context(mut self, context: impl Into<Cow<'static, str>>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Maps a non-success GitHub API status to an error.
    ///
    /// Every upstream status is [`ErrorKind::ExternalError`]: a 401 or 404
    /// from GitHub says nothing about the caller's own token.
    pub(crate) fn from_status(status: StatusCode, endpoint: &str, body: &str) -> Self {
        Self::new(ErrorKind::ExternalError)
            .with_message(format!("GitHub API returned {status} for {endpoint}"))
            .with_context(body.chars().take(512).collect::<String>())
    }

    /// Returns `true` if the error kind is [`ErrorKind::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::from_source(ErrorKind::Serialization, error)
                .with_message("Failed to decode GitHub response")
        } else if error.is_timeout() || error.is_connect() {
            Self::from_source(ErrorKind::NetworkError, error).with_message("GitHub request failed")
        } else {
            let message = error.to_string();
            Self::from_source(ErrorKind::ExternalError, error).with_message(message)
        }
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        let message = error.to_string();
        Self::from_source(ErrorKind::Authentication, error).with_message(message)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::from_source(ErrorKind::Serialization, error).with_message("Invalid JSON payload")
    }
}

impl From<StorageError> for Error {
    fn from(error: StorageError) -> Self {
        let kind = if error.is_not_found() {
            ErrorKind::NotFound
        } else {
            ErrorKind::Storage
        };

        let message = error.to_string();
        Self::from_source(kind, error).with_message(message)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn error_display_includes_kind_and_message() {
        let error = Error::new(ErrorKind::NotFound).with_message("no installation for acme");

        let display = error.to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("no installation for acme"));
    }

    #[test]
    fn upstream_statuses_are_external() {
        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::BAD_GATEWAY,
        ] {
            let error = Error::from_status(status, "/repos/a/b", "{}");
            assert_eq!(error.kind, ErrorKind::ExternalError, "{status}");
            assert!(!error.is_not_found());
        }
    }

    #[test]
    fn storage_not_found_is_preserved() {
        let error = Error::from(StorageError::not_found("a/b/grader.tgz"));
        assert!(error.is_not_found());
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(
            ErrorKind::from_str("invalid_input").unwrap(),
            ErrorKind::InvalidInput
        );
        assert!(ErrorKind::from_str("bogus").is_err());
    }
}
