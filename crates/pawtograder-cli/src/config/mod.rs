//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig         # Host, port, TLS, shutdown
//! ├── middleware: MiddlewareConfig # CORS, recovery/timeouts
//! ├── service: ServiceConfig       # GitHub App, OIDC, Discord, Supabase, storage
//! └── log_format: LogFormat        # Text or JSON log lines
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! pawtograder --github-app-id 12345 --port 8080
//!
//! # Or via environment variables
//! GITHUB_APP_ID=12345 PORT=8080 pawtograder
//! ```

mod middleware;
mod server;

use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
pub use middleware::MiddlewareConfig;
use pawtograder_server::service::ServiceConfig;
use serde::{Deserialize, Serialize};
pub use server::ServerConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Output format of log lines.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines with ANSI colors.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Complete CLI configuration.
///
/// Combines all configuration groups for the grading gateway:
/// - [`ServerConfig`]: Network binding and TLS
/// - [`MiddlewareConfig`]: HTTP middleware (CORS, recovery)
/// - [`ServiceConfig`]: External services (GitHub, Discord, Supabase, storage)
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "pawtograder")]
#[command(about = "Pawtograder grading gateway")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// External service configuration.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap picks its values up as
    /// environment defaults.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with `RUST_LOG` filtering, defaulting to `info`.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        match self.log_format {
            LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
            LogFormat::Json => registry
                .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
                .init(),
        }
    }

    /// Logs the version and, at debug level, build information.
    fn log_build_info() {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "Starting pawtograder gateway"
        );

        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.service
            .validate()
            .context("invalid service configuration")?;
        Ok(())
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            github_app_id = self.service.github.app_id,
            github_api_url = %self.service.github.api_url,
            oidc_issuer = %self.service.oidc.issuer(),
            supabase_url = %self.service.supabase.url,
            storage_backend = ?self.service.storage.backend,
            storage_bucket = %self.service.storage.bucket,
            "Service configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "tls").then_some("tls"),
            cfg!(feature = "dotenv").then_some("dotenv"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLIC_KEY: &str = "ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c";

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec![
            "pawtograder",
            "--github-app-id",
            "12345",
            "--github-private-key",
            "test-private-key",
            "--discord-public-key",
            PUBLIC_KEY,
            "--supabase-url",
            "https://project.supabase.co",
            "--supabase-service-role-key",
            "service-role",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_minimal_arguments() {
        let cli = parse(&[]);

        assert_eq!(cli.server.port, 3000);
        assert_eq!(cli.service.storage.bucket, "graders");
        assert_eq!(cli.middleware.recovery.request_timeout, 30);
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn rejects_invalid_service_config() {
        let cli = parse(&["--storage-bucket", " "]);
        let error = cli.validate().unwrap_err();
        assert!(format!("{error:#}").contains("invalid service configuration"));
    }

    #[test]
    fn parses_json_log_format() {
        let cli = parse(&["--log-format", "json", "--port", "8080"]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.server.port, 8080);
    }
}
