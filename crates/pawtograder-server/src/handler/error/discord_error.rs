//! Discord error to HTTP error conversion implementation.

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for Discord error conversions.
const TRACING_TARGET: &str = "pawtograder_server::handler::discord";

impl From<pawtograder_discord::Error> for HttpError<'static> {
    fn from(error: pawtograder_discord::Error) -> Self {
        use pawtograder_discord::Error as DiscordError;

        match error {
            DiscordError::MissingHeader(header) => ErrorKind::InvalidSignature
                .with_message(format!("Missing {header} header"))
                .with_resource("discord"),

            DiscordError::MalformedSignature(_) | DiscordError::InvalidSignature => {
                ErrorKind::InvalidSignature
                    .with_resource("discord")
                    .with_context(error.to_string())
            }

            DiscordError::InvalidPayload(ref source) => ErrorKind::BadRequest
                .with_message("Unrecognized Discord payload")
                .with_resource("discord")
                .with_context(source.to_string()),

            DiscordError::InvalidPublicKey(_) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Discord verifier is misconfigured"
                );

                ErrorKind::InternalServerError.with_context(error.to_string())
            }

            DiscordError::Queue(_) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Role sync could not be queued"
                );

                ErrorKind::InternalServerError
                    .with_message("Role sync could not be queued")
                    .with_context(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use pawtograder_discord::Error as DiscordError;

    use super::*;

    fn status(error: DiscordError) -> u16 {
        HttpError::from(error).into_response().status().as_u16()
    }

    #[test]
    fn signature_failures_are_unauthorized() {
        assert_eq!(status(DiscordError::InvalidSignature), 401);
        assert_eq!(status(DiscordError::MissingHeader("X-Signature-Ed25519")), 401);
        assert_eq!(status(DiscordError::MalformedSignature("odd length".into())), 401);
    }

    #[test]
    fn payload_and_queue_failures() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(status(DiscordError::InvalidPayload(parse_error)), 400);
        assert_eq!(
            status(DiscordError::queue(std::io::Error::other("rpc down"))),
            500
        );
    }
}
