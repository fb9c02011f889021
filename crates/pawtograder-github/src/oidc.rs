//! GitHub Actions OIDC token verification.
//!
//! A token is accepted when it carries a valid signature from a key in the
//! issuer's JWKS, passes the standard time and issuer checks, and was minted
//! for the grading workflow on `main`. Every other workflow, branch or fork is
//! rejected even with a valid signature.

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::app::send_json;
use crate::{Error, ErrorKind, OidcConfig, Result, TRACING_TARGET_OIDC};

/// Issuer of GitHub Actions ID tokens.
pub const GITHUB_ACTIONS_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Required suffix of the `workflow_ref` claim.
pub const GRADING_WORKFLOW_SUFFIX: &str = ".github/workflows/grade.yml@refs/heads/main";

/// Signature algorithms accepted in token headers.
const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::EdDSA,
];

/// Timeout for key set downloads.
const JWKS_TIMEOUT: Duration = Duration::from_secs(10);

/// Claims of a GitHub Actions ID token.
///
/// Commonly used claims are typed. Everything else the issuer sends is kept in
/// [`OidcClaims::extra`], so serializing the struct reproduces the token's
/// claim set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OidcClaims {
    /// Token issuer.
    pub iss: String,
    /// Subject, e.g. `repo:owner/name:ref:refs/heads/main`.
    pub sub: String,
    /// Audience, a string or an array of strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    /// Expiry, in seconds since the epoch.
    pub exp: i64,
    /// Not-before, in seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    /// Issued-at, in seconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Repository the workflow ran in, `owner/name`.
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_owner: Option<String>,
    /// Workflow file and ref, e.g.
    /// `owner/name/.github/workflows/grade.yml@refs/heads/main`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// All remaining claims.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

struct OidcVerifierInner {
    http: Client,
    config: OidcConfig,
    jwks: RwLock<Option<CachedKeys>>,
}

/// Verifies GitHub Actions ID tokens.
///
/// The issuer's key set is cached for the configured TTL. A token signed with
/// a key id missing from the cache triggers a single refetch before it is
/// rejected.
#[derive(Clone)]
pub struct OidcVerifier {
    inner: Arc<OidcVerifierInner>,
}

impl OidcVerifier {
    /// Creates a verifier for the configured issuer.
    pub fn new(config: OidcConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(JWKS_TIMEOUT)
            .user_agent(concat!("pawtograder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                Error::from_source(ErrorKind::Configuration, e)
                    .with_message("Failed to create JWKS HTTP client")
            })?;

        tracing::debug!(
            target: TRACING_TARGET_OIDC,
            issuer = %config.issuer(),
            audience = ?config.audience,
            "OIDC verifier created"
        );

        Ok(Self {
            inner: Arc::new(OidcVerifierInner {
                http,
                config,
                jwks: RwLock::new(None),
            }),
        })
    }

    /// Returns the verifier configuration.
    pub fn config(&self) -> &OidcConfig {
        &self.inner.config
    }

    /// Verifies a token and returns its claims.
    pub async fn verify(&self, token: &str) -> Result<OidcClaims> {
        let header = decode_header(token).map_err(|e| {
            Error::from_source(ErrorKind::Authentication, e).with_message("Malformed OIDC token")
        })?;

        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(Error::new(ErrorKind::Authentication)
                .with_message(format!("Signature algorithm {:?} is not accepted", header.alg)));
        }

        let kid = header.kid.ok_or_else(|| {
            Error::new(ErrorKind::Authentication).with_message("OIDC token header has no kid")
        })?;

        let decoding_key = self.decoding_key(&kid).await?;

        let config = &self.inner.config;
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        match config.audience.as_deref() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<OidcClaims>(token, &decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(
                    target: TRACING_TARGET_OIDC,
                    kid = %kid,
                    error = %e,
                    "OIDC token rejected"
                );
                Error::from(e)
            })?
            .claims;

        check_workflow_ref(&claims)?;

        tracing::debug!(
            target: TRACING_TARGET_OIDC,
            repository = %claims.repository,
            run_id = ?claims.run_id,
            "OIDC token verified"
        );

        Ok(claims)
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let cached = self.inner.jwks.read().await;
            if let Some(cached) = cached.as_ref()
                && cached.fetched_at.elapsed() < self.inner.config.jwks_ttl()
                && let Some(jwk) = cached.keys.find(kid)
            {
                return published_key(jwk);
            }
        }

        let keys = self.refresh().await?;
        let jwk = keys.find(kid).ok_or_else(|| {
            Error::new(ErrorKind::Authentication)
                .with_message(format!("Unknown OIDC signing key: {kid}"))
        })?;

        published_key(jwk)
    }

    async fn refresh(&self) -> Result<JwkSet> {
        let url = self.inner.config.jwks_url();
        tracing::info!(target: TRACING_TARGET_OIDC, url = %url, "Refreshing JWKS");

        let keys: JwkSet = send_json(self.inner.http.get(&url), &url).await?;

        let mut cached = self.inner.jwks.write().await;
        *cached = Some(CachedKeys {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }
}

/// An unusable key in the issuer's key set is an upstream fault, not a bad token.
fn published_key(jwk: &Jwk) -> Result<DecodingKey> {
    DecodingKey::from_jwk(jwk).map_err(|e| {
        Error::from_source(ErrorKind::ExternalError, e)
            .with_message("OIDC issuer published an unusable signing key")
    })
}

/// Rejects claims that were not issued for the grading workflow on `main`.
pub fn check_workflow_ref(claims: &OidcClaims) -> Result<()> {
    let workflow_ref = claims.workflow_ref.as_deref().ok_or_else(|| {
        Error::new(ErrorKind::Authorization).with_message("OIDC token has no workflow_ref claim")
    })?;

    if !workflow_ref.ends_with(GRADING_WORKFLOW_SUFFIX) {
        tracing::warn!(
            target: TRACING_TARGET_OIDC,
            repository = %claims.repository,
            workflow_ref = %workflow_ref,
            "OIDC token issued for an untrusted workflow"
        );
        return Err(Error::new(ErrorKind::Authorization).with_message(format!(
            "Untrusted workflow_ref {workflow_ref}, expected a ref ending in {GRADING_WORKFLOW_SUFFIX}"
        )));
    }

    Ok(())
}

impl std::fmt::Debug for OidcVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcVerifier")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::app::tests::{TEST_JWKS, TEST_PRIVATE_KEY};

    const TRUSTED_REF: &str =
        "pawtograder-org/hw1-alice/.github/workflows/grade.yml@refs/heads/main";

    async fn jwks_server(expected_fetches: u64) -> MockServer {
        let server = MockServer::start().await;
        let jwks: Value = serde_json::from_str(TEST_JWKS).unwrap();

        Mock::given(method("GET"))
            .and(path("/.well-known/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .expect(expected_fetches)
            .mount(&server)
            .await;

        server
    }

    fn claims(issuer: &str, workflow_ref: Option<&str>) -> Value {
        let now = Timestamp::now().as_second();
        let mut claims = json!({
            "iss": issuer,
            "sub": "repo:pawtograder-org/hw1-alice:ref:refs/heads/main",
            "aud": "pawtograder",
            "iat": now,
            "nbf": now - 5,
            "exp": now + 300,
            "repository": "pawtograder-org/hw1-alice",
            "repository_owner": "pawtograder-org",
            "sha": "9b1c0de",
            "ref": "refs/heads/main",
            "run_id": "1234567",
            "actor": "alice",
            "runner_environment": "github-hosted",
            "job_workflow_ref": TRUSTED_REF,
        });
        if let Some(workflow_ref) = workflow_ref {
            claims["workflow_ref"] = json!(workflow_ref);
        }
        claims
    }

    fn sign(claims: &Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_owned());
        let key = EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    fn verifier(server: &MockServer) -> OidcVerifier {
        OidcVerifier::new(OidcConfig::new(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn accepts_grading_workflow_and_returns_all_claims() {
        let server = jwks_server(1).await;
        let expected = claims(&server.uri(), Some(TRUSTED_REF));
        let token = sign(&expected, "test-key-1");

        let claims = verifier(&server).verify(&token).await.unwrap();

        assert_eq!(claims.repository, "pawtograder-org/hw1-alice");
        assert_eq!(claims.extra["runner_environment"], "github-hosted");
        assert_eq!(serde_json::to_value(&claims).unwrap(), expected);
    }

    #[tokio::test]
    async fn rejects_other_workflows_naming_the_ref() {
        let server = jwks_server(1).await;
        let verifier = verifier(&server);

        for workflow_ref in [
            "pawtograder-org/hw1-alice/.github/workflows/grade.yml@refs/heads/feature",
            "pawtograder-org/hw1-alice/.github/workflows/evil.yml@refs/heads/main",
            "mallory/hw1-fork/.github/workflows/grade.yml@refs/heads/mainline",
        ] {
            let token = sign(&claims(&server.uri(), Some(workflow_ref)), "test-key-1");
            let error = verifier.verify(&token).await.unwrap_err();

            assert_eq!(error.kind, ErrorKind::Authorization);
            assert!(error.to_string().contains(workflow_ref));
        }
    }

    #[tokio::test]
    async fn rejects_missing_workflow_ref() {
        let server = jwks_server(1).await;
        let token = sign(&claims(&server.uri(), None), "test-key-1");

        let error = verifier(&server).verify(&token).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn rejects_expired_tokens() {
        let server = jwks_server(1).await;
        let mut expired = claims(&server.uri(), Some(TRUSTED_REF));
        let now = Timestamp::now().as_second();
        expired["exp"] = json!(now - 3600);
        expired["nbf"] = json!(now - 7200);

        let error = verifier(&server)
            .verify(&sign(&expired, "test-key-1"))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn rejects_foreign_issuer() {
        let server = jwks_server(1).await;
        let token = sign(
            &claims("https://issuer.example.com", Some(TRUSTED_REF)),
            "test-key-1",
        );

        let error = verifier(&server).verify(&token).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn checks_audience_only_when_configured() {
        let server = jwks_server(1).await;
        let token = sign(&claims(&server.uri(), Some(TRUSTED_REF)), "test-key-1");

        let verifier =
            OidcVerifier::new(OidcConfig::new(server.uri()).with_audience("someone-else")).unwrap();
        let error = verifier.verify(&token).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn unknown_kid_fails_after_one_refresh() {
        let server = jwks_server(1).await;
        let token = sign(&claims(&server.uri(), Some(TRUSTED_REF)), "rotated-key");

        let error = verifier(&server).verify(&token).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Authentication);
        assert!(error.to_string().contains("rotated-key"));
    }

    #[tokio::test]
    async fn key_set_is_cached_between_requests() {
        let server = jwks_server(1).await;
        let verifier = verifier(&server);
        let token = sign(&claims(&server.uri(), Some(TRUSTED_REF)), "test-key-1");

        verifier.verify(&token).await.unwrap();
        verifier.verify(&token).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_key_set_is_an_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let token = sign(&claims(&server.uri(), Some(TRUSTED_REF)), "test-key-1");

        let error = verifier(&server).verify(&token).await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::ExternalError);
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_without_fetching_keys() {
        let server = jwks_server(0).await;

        let error = verifier(&server).verify("not.a.jwt").await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::Authentication);
    }
}
