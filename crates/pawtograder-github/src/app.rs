//! GitHub App authentication.
//!
//! The App authenticates as itself with a short-lived RS256 JWT and trades it
//! for installation access tokens, which are what every repository call uses.

use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, ErrorKind, GitHubConfig, Result, TRACING_TARGET};

/// Media type requested from the GitHub REST API.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Pinned GitHub REST API version.
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Page size used when listing installations.
const INSTALLATIONS_PER_PAGE: usize = 100;

/// App JWTs are backdated to tolerate clock drift with GitHub.
const APP_JWT_BACKDATE_SECS: i64 = 60;

/// GitHub rejects App JWTs that live longer than ten minutes.
const APP_JWT_LIFETIME_SECS: i64 = 540;

struct GitHubAppInner {
    http: Client,
    app_id: u64,
    encoding_key: EncodingKey,
    api_url: String,
}

/// A GitHub App identity able to enumerate installations and mint
/// installation access tokens.
#[derive(Clone)]
pub struct GitHubApp {
    inner: Arc<GitHubAppInner>,
}

/// Claims of an App JWT.
#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// The account an installation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login of the user or organization.
    pub login: String,
    /// Account type, `Organization` or `User`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// An installation of the App on one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    /// Installation id.
    pub id: u64,
    /// Account the App is installed on.
    pub account: Account,
}

/// A short-lived installation access token.
#[derive(Clone, Deserialize)]
pub struct InstallationToken {
    /// Bearer token value.
    pub token: String,
    /// Expiry reported by GitHub.
    pub expires_at: Timestamp,
}

impl InstallationToken {
    /// Returns `true` if the token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        let margin = i64::try_from(margin.as_secs()).unwrap_or(i64::MAX);
        self.expires_at.as_second().saturating_sub(margin) <= Timestamp::now().as_second()
    }
}

impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl GitHubApp {
    /// Creates an App client from configuration.
    ///
    /// Fails if the private key is not an RSA PEM or the API URL is invalid.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let encoding_key =
            EncodingKey::from_rsa_pem(config.private_key_pem().as_bytes()).map_err(|e| {
                Error::from_source(ErrorKind::Configuration, e)
                    .with_message("GitHub App private key is not a valid RSA PEM")
            })?;

        let api_url = config.api_url.trim_end_matches('/').to_owned();
        Url::parse(&api_url).map_err(|e| {
            Error::from_source(ErrorKind::Configuration, e)
                .with_message(format!("Invalid GitHub API URL: {api_url}"))
        })?;

        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("pawtograder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                Error::from_source(ErrorKind::Configuration, e)
                    .with_message("Failed to create GitHub HTTP client")
            })?;

        tracing::debug!(
            target: TRACING_TARGET,
            app_id = config.app_id,
            api_url = %api_url,
            "GitHub App client created"
        );

        Ok(Self {
            inner: Arc::new(GitHubAppInner {
                http,
                app_id: config.app_id,
                encoding_key,
                api_url,
            }),
        })
    }

    /// Returns the App id.
    pub fn app_id(&self) -> u64 {
        self.inner.app_id
    }

    /// Returns the absolute URL of an API path.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inner.api_url, path)
    }

    /// Starts a request with the GitHub media type and API version set.
    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.inner
            .http
            .request(method, self.endpoint(path))
            .header(reqwest::header::ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
    }

    /// Signs a JWT that authenticates as the App itself.
    pub fn app_jwt(&self) -> Result<String> {
        let now = Timestamp::now().as_second();
        let claims = AppClaims {
            iat: now - APP_JWT_BACKDATE_SECS,
            exp: now + APP_JWT_LIFETIME_SECS,
            iss: self.inner.app_id.to_string(),
        };

        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.inner.encoding_key,
        )
        .map_err(|e| {
            Error::from_source(ErrorKind::Configuration, e)
                .with_message("Failed to sign GitHub App JWT")
        })?;

        Ok(token)
    }

    /// Lists every installation of the App, following pagination.
    pub async fn list_installations(&self) -> Result<Vec<Installation>> {
        let jwt = self.app_jwt()?;
        let mut installations = Vec::new();
        let mut page = 1usize;

        loop {
            let request = self
                .request(reqwest::Method::GET, "/app/installations")
                .bearer_auth(&jwt)
                .query(&[("per_page", INSTALLATIONS_PER_PAGE), ("page", page)]);

            let batch: Vec<Installation> = send_json(request, "/app/installations").await?;
            let batch_len = batch.len();
            installations.extend(batch);

            tracing::debug!(
                target: TRACING_TARGET,
                page,
                count = batch_len,
                "Fetched installations page"
            );

            if batch_len < INSTALLATIONS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(installations)
    }

    /// Mints a new access token for one installation.
    pub async fn create_installation_token(
        &self,
        installation_id: u64,
    ) -> Result<InstallationToken> {
        let path = format!("/app/installations/{installation_id}/access_tokens");
        let request = self
            .request(reqwest::Method::POST, &path)
            .bearer_auth(self.app_jwt()?);

        let token: InstallationToken = send_json(request, &path).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            installation_id,
            expires_at = %token.expires_at,
            "Installation access token minted"
        );

        Ok(token)
    }
}

impl std::fmt::Debug for GitHubApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubApp")
            .field("app_id", &self.inner.app_id)
            .field("api_url", &self.inner.api_url)
            .finish_non_exhaustive()
    }
}

/// Sends a request and fails on any non-success status.
pub(crate) async fn send(request: RequestBuilder, endpoint: &str) -> Result<Response> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        target: TRACING_TARGET,
        endpoint = %endpoint,
        status = %status,
        "GitHub API request failed"
    );

    Err(Error::from_status(status, endpoint, &body))
}

/// Sends a request and decodes a JSON body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: &str,
) -> Result<T> {
    Ok(send(request, endpoint).await?.json().await?)
}
