//! Discord error types.

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for Discord operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while handling Discord requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configured public key is not a valid Ed25519 key.
    #[error("invalid Discord public key: {0}")]
    InvalidPublicKey(String),

    /// A required signature header is absent.
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    /// The signature header is not a hex-encoded Ed25519 signature.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature does not match the timestamp and body.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The body is not a payload this service understands.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The role-sync queue rejected the request.
    #[error("role sync enqueue failed: {0}")]
    Queue(#[source] BoxedError),
}

impl Error {
    /// Wraps a queue backend error.
    pub fn queue(source: impl Into<BoxedError>) -> Self {
        Self::Queue(source.into())
    }

    /// Returns `true` if the request failed authentication.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::MissingHeader(_) | Self::MalformedSignature(_) | Self::InvalidSignature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_failures_are_unauthorized() {
        assert!(Error::InvalidSignature.is_unauthorized());
        assert!(Error::MissingHeader("X-Signature-Ed25519").is_unauthorized());
        assert!(!Error::queue(std::io::Error::other("down")).is_unauthorized());
    }
}
