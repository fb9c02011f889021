//! GitHub App and Actions OIDC configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::oidc::GITHUB_ACTIONS_ISSUER;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default timeout for GitHub API requests: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default lifetime of a cached JWKS document: 10 minutes.
pub const DEFAULT_JWKS_TTL_SECS: u64 = 600;

/// Configuration for the GitHub App.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct GitHubConfig {
    /// Numeric GitHub App ID.
    #[cfg_attr(feature = "config", arg(long = "github-app-id", env = "GITHUB_APP_ID"))]
    pub app_id: u64,

    /// PEM-encoded RSA private key of the GitHub App.
    ///
    /// Literal `\n` sequences are accepted in place of newlines.
    #[cfg_attr(
        feature = "config",
        arg(long = "github-private-key", env = "GITHUB_PRIVATE_KEY", hide_env_values = true)
    )]
    pub private_key: String,

    /// Base URL of the GitHub REST API.
    #[cfg_attr(
        feature = "config",
        arg(long = "github-api-url", env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)
    )]
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// GitHub API request timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "github-timeout", env = "GITHUB_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl GitHubConfig {
    /// Creates a configuration for the given App credentials.
    pub fn new(app_id: u64, private_key: impl Into<String>) -> Self {
        Self {
            app_id,
            private_key: private_key.into(),
            api_url: default_api_url(),
            http_timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Overrides the API base URL.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the private key PEM with escaped newlines restored.
    pub fn private_key_pem(&self) -> String {
        self.private_key.replace("\\n", "\n")
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("app_id", &self.app_id)
            .field("api_url", &self.api_url)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

/// Configuration for GitHub Actions OIDC token verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct OidcConfig {
    /// Expected token issuer. The JWKS is fetched from `{issuer}/.well-known/jwks`.
    #[cfg_attr(
        feature = "config",
        arg(long = "oidc-issuer", env = "OIDC_ISSUER", default_value = GITHUB_ACTIONS_ISSUER)
    )]
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Expected audience. Audience is not checked when unset.
    #[cfg_attr(feature = "config", arg(long = "oidc-audience", env = "OIDC_AUDIENCE"))]
    #[serde(default)]
    pub audience: Option<String>,

    /// How long a fetched key set is trusted, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "oidc-jwks-ttl", env = "OIDC_JWKS_TTL", default_value = "600")
    )]
    #[serde(default = "default_jwks_ttl_secs")]
    pub jwks_ttl: u64,
}

fn default_issuer() -> String {
    GITHUB_ACTIONS_ISSUER.to_owned()
}

fn default_jwks_ttl_secs() -> u64 {
    DEFAULT_JWKS_TTL_SECS
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: None,
            jwks_ttl: DEFAULT_JWKS_TTL_SECS,
        }
    }
}

impl OidcConfig {
    /// Creates a configuration trusting the given issuer.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Self::default()
        }
    }

    /// Requires tokens to carry the given audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the key set TTL in seconds.
    pub fn with_jwks_ttl(mut self, secs: u64) -> Self {
        self.jwks_ttl = secs;
        self
    }

    /// Returns the issuer without a trailing slash.
    pub fn issuer(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }

    /// Returns the URL of the issuer's key set.
    pub fn jwks_url(&self) -> String {
        format!("{}/.well-known/jwks", self.issuer())
    }

    /// Returns the key set TTL as a Duration.
    pub fn jwks_ttl(&self) -> Duration {
        Duration::from_secs(self.jwks_ttl)
    }
}
