#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use pawtograder_discord::{DiscordConfig, DiscordVerifier};
use pawtograder_github::{GitHubApp, GitHubConfig, InstallationRegistry, OidcConfig, OidcVerifier};
use pawtograder_opendal::{BackendType, StorageBackend, StorageConfig};
use pawtograder_supabase::{SupabaseClient, SupabaseConfig};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, TRACING_TARGET_SERVICE};

/// Default values for configuration options.
mod defaults {
    use pawtograder_opendal::BackendType;

    /// Default storage backend.
    pub const STORAGE_BACKEND: BackendType = BackendType::S3;

    /// Default bucket holding grader tarballs.
    pub const STORAGE_BUCKET: &str = "graders";
}

/// Object storage options for grader tarballs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StorageOptions {
    /// Storage backend: `s3`, `gcs`, `azblob` or `memory`.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-backend", env = "STORAGE_BACKEND", default_value = "s3")
    )]
    pub backend: BackendType,

    /// Bucket (or container) holding grader tarballs.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-bucket", env = "STORAGE_BUCKET", default_value = defaults::STORAGE_BUCKET)
    )]
    pub bucket: String,

    /// Storage region.
    #[cfg_attr(feature = "config", arg(long = "storage-region", env = "STORAGE_REGION"))]
    pub region: Option<String>,

    /// Endpoint of S3-compatible storage such as Supabase Storage.
    #[cfg_attr(feature = "config", arg(long = "storage-endpoint", env = "STORAGE_ENDPOINT"))]
    pub endpoint: Option<String>,

    /// S3 access key ID.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-access-key-id", env = "STORAGE_ACCESS_KEY_ID")
    )]
    pub access_key_id: Option<String>,

    /// S3 secret access key.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "storage-secret-access-key",
            env = "STORAGE_SECRET_ACCESS_KEY",
            hide_env_values = true
        )
    )]
    pub secret_access_key: Option<String>,

    /// Azure storage account name.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-account-name", env = "STORAGE_ACCOUNT_NAME")
    )]
    pub account_name: Option<String>,

    /// Azure storage account key.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-account-key", env = "STORAGE_ACCOUNT_KEY", hide_env_values = true)
    )]
    pub account_key: Option<String>,

    /// Base64-encoded GCS service account credential.
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-credential", env = "STORAGE_CREDENTIAL", hide_env_values = true)
    )]
    pub credential: Option<String>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            backend: defaults::STORAGE_BACKEND,
            bucket: defaults::STORAGE_BUCKET.to_owned(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            account_name: None,
            account_key: None,
            credential: None,
        }
    }
}

impl From<StorageOptions> for StorageConfig {
    fn from(options: StorageOptions) -> Self {
        Self {
            backend_type: options.backend,
            root: options.bucket,
            region: options.region,
            endpoint: options.endpoint,
            access_key_id: options.access_key_id,
            secret_access_key: options.secret_access_key,
            account_name: options.account_name,
            account_key: options.account_key,
            credential: options.credential,
        }
    }
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// GitHub App credentials.
    #[cfg_attr(feature = "config", command(flatten))]
    pub github: GitHubConfig,

    /// Actions OIDC token verification.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub oidc: OidcConfig,

    /// Discord application.
    #[cfg_attr(feature = "config", command(flatten))]
    pub discord: DiscordConfig,

    /// Supabase project hosting the grader mapping and role sync queue.
    #[cfg_attr(feature = "config", command(flatten))]
    pub supabase: SupabaseConfig,

    /// Grader tarball storage.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub storage: StorageOptions,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Checks the constraints the builder enforces.
    ///
    /// Configuration parsed from arguments or the environment bypasses the
    /// builder, so callers validate it before connecting.
    pub fn validate(&self) -> Result<()> {
        Self::builder()
            .with_github(self.github.clone())
            .with_oidc(self.oidc.clone())
            .with_discord(self.discord.clone())
            .with_supabase(self.supabase.clone())
            .with_storage(self.storage.clone())
            .build()
            .map(|_| ())
            .map_err(|err| Error::config(err.to_string()))
    }

    /// Creates the GitHub App client.
    pub fn connect_github(&self) -> Result<GitHubApp> {
        GitHubApp::new(&self.github).map_err(Error::from)
    }

    /// Lists the App's installations and builds a client for each.
    pub async fn discover_installations(&self, app: &GitHubApp) -> Result<InstallationRegistry> {
        let registry = InstallationRegistry::discover(app).await?;

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            installations = registry.len(),
            owners = ?registry.owners().collect::<Vec<_>>(),
            "GitHub App installations discovered"
        );

        Ok(registry)
    }

    /// Creates the Actions ID token verifier.
    pub fn oidc_verifier(&self) -> Result<OidcVerifier> {
        OidcVerifier::new(self.oidc.clone()).map_err(Error::from)
    }

    /// Creates the Supabase RPC client.
    pub fn connect_supabase(&self) -> Result<SupabaseClient> {
        SupabaseClient::new(&self.supabase).map_err(Error::from)
    }

    /// Opens the grader tarball storage backend.
    pub fn connect_storage(&self) -> Result<StorageBackend> {
        let config = StorageConfig::from(self.storage.clone());
        StorageBackend::new(config).map_err(Error::from)
    }

    /// Decodes the Discord request verification key.
    pub fn discord_verifier(&self) -> Result<DiscordVerifier> {
        DiscordVerifier::from_config(&self.discord).map_err(Error::from)
    }
}

impl ServiceConfigBuilder {
    fn validate(builder: &ServiceConfigBuilder) -> Result<(), String> {
        if let Some(github) = &builder.github {
            if github.app_id == 0 {
                return Err("GitHub App ID must be set".to_owned());
            }
            if github.private_key.trim().is_empty() {
                return Err("GitHub App private key cannot be empty".to_owned());
            }
        }

        if let Some(discord) = &builder.discord {
            let key = discord.public_key.trim();
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err("Discord public key must be 64 hex characters".to_owned());
            }
        }

        if let Some(supabase) = &builder.supabase {
            if !supabase.url.starts_with("https://") && !supabase.url.starts_with("http://") {
                return Err("Supabase URL must start with 'https://' or 'http://'".to_owned());
            }
            if supabase.service_role_key.is_empty() {
                return Err("Supabase service role key cannot be empty".to_owned());
            }
        }

        if let Some(storage) = &builder.storage {
            if storage.bucket.trim().is_empty() {
                return Err("Storage bucket cannot be empty".to_owned());
            }
            if storage.backend == BackendType::Memory {
                return Err("Memory storage cannot sign grader download URLs".to_owned());
            }
        }

        Ok(())
    }
}
