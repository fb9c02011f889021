//! Service initialization error types.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for service operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid or missing configuration.
    Config,
    /// A dependency could not be reached or rejected the request.
    External,
    /// Internal service logic errors.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::External => "external_service",
            Self::Internal => "internal_service",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service error with structured information.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches a source error.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates a new configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a new external service error.
    #[inline]
    pub fn external(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::External, full_message)
    }

    /// Creates a new internal service error.
    #[inline]
    pub fn internal(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::Internal, full_message)
    }
}

impl From<pawtograder_github::Error> for Error {
    fn from(err: pawtograder_github::Error) -> Self {
        use pawtograder_github::ErrorKind as GitHubErrorKind;

        match err.kind {
            GitHubErrorKind::Configuration | GitHubErrorKind::InvalidInput => {
                Error::config(format!("github: {err}")).with_source(err)
            }
            _ => Error::external("github", err.to_string()).with_source(err),
        }
    }
}

impl From<pawtograder_discord::Error> for Error {
    fn from(err: pawtograder_discord::Error) -> Self {
        Error::config(format!("discord: {err}")).with_source(err)
    }
}

impl From<pawtograder_supabase::Error> for Error {
    fn from(err: pawtograder_supabase::Error) -> Self {
        Error::external("supabase", err.to_string()).with_source(err)
    }
}

impl From<pawtograder_opendal::StorageError> for Error {
    fn from(err: pawtograder_opendal::StorageError) -> Self {
        Error::external("storage", err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_errors_name_the_service() {
        let error = Error::external("github", "Connection refused");

        assert_eq!(error.kind(), ErrorKind::External);
        assert!(error.to_string().contains("github"));
        assert!(error.to_string().contains("Connection refused"));
    }

    #[test]
    fn sources_are_chained() {
        let source = std::io::Error::other("unreachable");
        let error = Error::internal("storage", "Backend unavailable").with_source(source);

        assert!(StdError::source(&error).is_some());
        assert_eq!(error.kind(), ErrorKind::Internal);
    }

    #[test]
    fn invalid_discord_keys_are_config_errors() {
        let error: Error = pawtograder_discord::DiscordVerifier::from_hex("not-hex")
            .unwrap_err()
            .into();

        assert_eq!(error.kind(), ErrorKind::Config);
        assert!(error.message().starts_with("discord"));
    }

    #[test]
    fn github_configuration_errors_are_config_errors() {
        let github = pawtograder_github::Error::new(pawtograder_github::ErrorKind::Configuration)
            .with_message("Invalid App private key");
        let error = Error::from(github);

        assert_eq!(error.kind(), ErrorKind::Config);
    }

    #[test]
    fn error_kind_as_str() {
        assert_eq!(ErrorKind::Config.as_str(), "config");
        assert_eq!(ErrorKind::External.as_str(), "external_service");
        assert_eq!(ErrorKind::Internal.as_str(), "internal_service");
    }
}
