//! GitHub error to HTTP error conversion implementation.
//!
//! Token and workflow rejections keep their message, since it tells the
//! caller what to fix. Upstream GitHub statuses, including 401, 403 and 404,
//! arrive as external errors and answer 502 with a generic message. The
//! original error is kept as logged context only.

use pawtograder_github::{ErrorKind as GitHubErrorKind, GRADING_WORKFLOW_SUFFIX};

use super::http_error::{Error as HttpError, ErrorKind};

/// Tracing target for GitHub error conversions.
const TRACING_TARGET: &str = "pawtograder_server::handler::github";

impl From<pawtograder_github::Error> for HttpError<'static> {
    fn from(error: pawtograder_github::Error) -> Self {
        let client_error = |kind: ErrorKind| {
            let http_error = kind.with_context(error.to_string());
            match error.message.clone() {
                Some(message) => http_error.with_message(message),
                None => http_error,
            }
        };

        match error.kind {
            GitHubErrorKind::InvalidInput => client_error(ErrorKind::BadRequest),

            GitHubErrorKind::Authentication => {
                client_error(ErrorKind::Unauthorized).with_resource("oidc_token")
            }

            GitHubErrorKind::Authorization => client_error(ErrorKind::Forbidden)
                .with_resource("workflow")
                .with_suggestion(format!(
                    "Request graders from a workflow ending in {GRADING_WORKFLOW_SUFFIX}"
                )),

            GitHubErrorKind::NotFound => client_error(ErrorKind::NotFound),

            GitHubErrorKind::NetworkError | GitHubErrorKind::ExternalError => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    error_kind = %error.kind,
                    "Upstream request failed"
                );

                ErrorKind::BadGateway.with_context(error.to_string())
            }

            GitHubErrorKind::Storage
            | GitHubErrorKind::Configuration
            | GitHubErrorKind::Serialization
            | GitHubErrorKind::Unknown => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    error_kind = %error.kind,
                    "Grader retrieval failed"
                );

                ErrorKind::InternalServerError.with_context(error.to_string())
            }
        }
    }
}
