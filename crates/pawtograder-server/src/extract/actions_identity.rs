//! GitHub Actions OIDC bearer token extraction.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use axum_extra::typed_header::TypedHeaderRejectionReason;
use pawtograder_github::{OidcClaims, OidcVerifier, RepositoryName};

use crate::TRACING_TARGET_AUTHENTICATION;
use crate::handler::{Error, ErrorKind, Result};

/// The verified identity of a grading workflow run.
///
/// Extracting this type requires an `Authorization: Bearer` header holding a
/// GitHub Actions ID token that verifies against the issuer's keys and was
/// minted for the grading workflow on `main`. Verified identities are cached
/// in request extensions.
#[must_use]
#[derive(Debug, Clone)]
pub struct ActionsIdentity {
    claims: OidcClaims,
    repository: RepositoryName,
}

impl ActionsIdentity {
    /// Returns the token's claims as issued.
    #[inline]
    pub fn claims(&self) -> &OidcClaims {
        &self.claims
    }

    /// Returns the repository the workflow ran in.
    #[inline]
    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    async fn from_token(verifier: &OidcVerifier, token: &str) -> Result<Self> {
        let claims = verifier.verify(token).await.inspect_err(|error| {
            tracing::warn!(
                target: TRACING_TARGET_AUTHENTICATION,
                error = %error,
                "Actions token rejected"
            );
        })?;

        let repository = claims.repository.parse()?;

        tracing::info!(
            target: TRACING_TARGET_AUTHENTICATION,
            repository = %repository,
            run_id = ?claims.run_id,
            actor = ?claims.actor,
            "Actions identity verified"
        );

        Ok(Self { claims, repository })
    }
}

impl<S> FromRequestParts<S> for ActionsIdentity
where
    S: Sync + Send,
    OidcVerifier: FromRef<S>,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Self>() {
            return Ok(identity.clone());
        }

        type AuthBearerHeader = TypedHeader<Authorization<Bearer>>;

        let TypedHeader(Authorization(bearer)) = AuthBearerHeader::from_request_parts(parts, state)
            .await
            .map_err(|rejection| match rejection.reason() {
                TypedHeaderRejectionReason::Missing => ErrorKind::MissingAuthToken
                    .with_message("Authentication required")
                    .with_context("Missing Authorization header with Bearer token")
                    .with_resource("authentication"),
                TypedHeaderRejectionReason::Error(_) => ErrorKind::MalformedAuthToken
                    .with_message("Invalid token format")
                    .with_context("Authorization header must contain a valid Bearer token")
                    .with_resource("authentication"),
                _ => ErrorKind::InternalServerError
                    .with_message("Authentication processing failed")
                    .with_context("Unexpected error during header extraction")
                    .with_resource("authentication"),
            })?;

        let verifier = OidcVerifier::from_ref(state);
        let identity = Self::from_token(&verifier, bearer.token()).await?;

        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}
