//! Signed Discord request body extraction.

use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::{HeaderMap, StatusCode};
use pawtograder_discord::{DiscordVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use serde::de::DeserializeOwned;

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};

/// A Discord request body whose signature has been verified.
///
/// The signature is checked over the raw bytes before they are parsed, so a
/// request that fails verification is rejected with `401` regardless of its
/// content.
#[must_use]
#[derive(Debug, Clone)]
pub struct DiscordPayload<T>(pub T);

impl<T> DiscordPayload<T> {
    /// Consumes the extractor and returns the payload.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

fn signature_header(headers: &HeaderMap, name: &'static str) -> Result<String> {
    let value = headers
        .get(name)
        .ok_or(pawtograder_discord::Error::MissingHeader(name))?;

    let value = value.to_str().map_err(|_| {
        pawtograder_discord::Error::MalformedSignature(format!("{name} is not valid ASCII"))
    })?;

    Ok(value.to_owned())
}

impl<S, T> FromRequest<S> for DiscordPayload<T>
where
    S: Send + Sync,
    DiscordVerifier: FromRef<S>,
    T: DeserializeOwned,
{
    type Rejection = Error<'static>;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let signature = signature_header(request.headers(), SIGNATURE_HEADER)?;
        let timestamp = signature_header(request.headers(), TIMESTAMP_HEADER)?;

        let body = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| {
                let kind = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ErrorKind::PayloadTooLarge
                } else {
                    ErrorKind::BadRequest
                };
                kind.with_resource("discord")
                    .with_context(rejection.body_text())
            })?;

        let verifier = DiscordVerifier::from_ref(state);
        verifier
            .verify(&signature, &timestamp, &body)
            .inspect_err(|error| {
                tracing::warn!(
                    target: TRACING_TARGET_AUTHENTICATION,
                    error = %error,
                    body_size = body.len(),
                    "Discord signature rejected"
                );
            })?;

        let payload = serde_json::from_slice(&body).map_err(pawtograder_discord::Error::from)?;
        Ok(Self(payload))
    }
}
