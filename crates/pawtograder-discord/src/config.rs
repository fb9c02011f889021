//! Discord application configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Configuration of the Discord application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct DiscordConfig {
    /// Hex-encoded Ed25519 public key from the Discord developer portal.
    #[cfg_attr(
        feature = "config",
        arg(long = "discord-public-key", env = "DISCORD_PUBLIC_KEY")
    )]
    pub public_key: String,
}

impl DiscordConfig {
    /// Creates a configuration with the given public key.
    pub fn new(public_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}
