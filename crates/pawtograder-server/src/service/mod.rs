//! Application state and dependency injection.

mod config;

use std::sync::Arc;

use pawtograder_discord::{DiscordVerifier, RoleSyncService};
use pawtograder_github::{
    GraderArtifactCache, GraderRepositoryLookup, InstallationRegistry, OidcVerifier,
};

pub use crate::service::config::{ServiceConfig, ServiceConfigBuilder, StorageOptions};
pub use crate::{Error, Result};
use crate::TRACING_TARGET_SERVICE;

/// Shared handle to the grader repository mapping.
pub type GraderLookup = Arc<dyn GraderRepositoryLookup>;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    // External services:
    pub installations: InstallationRegistry,
    pub grader_lookup: GraderLookup,
    pub artifact_cache: GraderArtifactCache,
    pub role_sync: RoleSyncService,

    // Internal services:
    pub oidc_verifier: OidcVerifier,
    pub discord_verifier: DiscordVerifier,
}

impl ServiceState {
    /// Assembles state from already constructed services.
    pub fn new(
        installations: InstallationRegistry,
        grader_lookup: GraderLookup,
        artifact_cache: GraderArtifactCache,
        role_sync: RoleSyncService,
        oidc_verifier: OidcVerifier,
        discord_verifier: DiscordVerifier,
    ) -> Self {
        Self {
            installations,
            grader_lookup,
            artifact_cache,
            role_sync,
            oidc_verifier,
            discord_verifier,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Discovers the GitHub App's installations, so the App credentials must
    /// be valid and GitHub reachable.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let github = config.connect_github()?;
        let installations = config.discover_installations(&github).await?;

        let supabase = config.connect_supabase()?;
        let storage = config.connect_storage()?;

        let service_state = Self {
            installations,
            grader_lookup: Arc::new(supabase.clone()),
            artifact_cache: GraderArtifactCache::new(storage),
            role_sync: RoleSyncService::new(supabase),

            oidc_verifier: config.oidc_verifier()?,
            discord_verifier: config.discord_verifier()?,
        };

        tracing::info!(
            target: TRACING_TARGET_SERVICE,
            installations = service_state.installations.len(),
            storage_backend = %config.storage.backend,
            oidc_issuer = %config.oidc.issuer(),
            "Service state initialized"
        );

        Ok(service_state)
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(installations: InstallationRegistry);
impl_di!(grader_lookup: GraderLookup);
impl_di!(artifact_cache: GraderArtifactCache);
impl_di!(role_sync: RoleSyncService);

// Internal services:
impl_di!(oidc_verifier: OidcVerifier);
impl_di!(discord_verifier: DiscordVerifier);
