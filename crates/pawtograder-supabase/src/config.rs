//! Supabase client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default timeout for RPC calls: 15 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Configuration for the Supabase RPC client.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    #[cfg_attr(feature = "config", arg(long = "supabase-url", env = "SUPABASE_URL"))]
    pub url: String,

    /// Service-role key used for both the `apikey` header and the bearer token.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "supabase-service-role-key",
            env = "SUPABASE_SERVICE_ROLE_KEY",
            hide_env_values = true
        )
    )]
    pub service_role_key: String,

    /// RPC request timeout in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "supabase-timeout", env = "SUPABASE_TIMEOUT", default_value = "15")
    )]
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SupabaseConfig {
    /// Creates a configuration for a project.
    pub fn new(url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_role_key: service_role_key.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Returns the timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
