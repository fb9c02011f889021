//! Error types for Supabase RPC calls.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for Supabase operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Supabase operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid client configuration.
    #[error("invalid Supabase configuration: {0}")]
    Config(String),
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// The RPC answered with a non-success status.
    #[error("RPC {function} returned {status}: {body}")]
    Rpc {
        function: String,
        status: StatusCode,
        body: String,
    },
}

impl From<Error> for pawtograder_discord::Error {
    fn from(err: Error) -> Self {
        pawtograder_discord::Error::queue(err)
    }
}

impl From<Error> for pawtograder_github::Error {
    fn from(err: Error) -> Self {
        use pawtograder_github::ErrorKind;

        let kind = match &err {
            Error::Serde(_) => ErrorKind::Serialization,
            Error::Config(_) => ErrorKind::Configuration,
            Error::Reqwest(e) if e.is_timeout() || e.is_connect() => ErrorKind::NetworkError,
            _ => ErrorKind::ExternalError,
        };

        let message = err.to_string();
        pawtograder_github::Error::from_source(kind, err).with_message(message)
    }
}
