//! HTTP/HTTPS server startup with lifecycle management.
//!
//! Protocol selection follows the configuration: with the `tls` feature and
//! both certificate paths set the server speaks HTTPS, otherwise plain HTTP.

mod error;
mod http_server;
#[cfg(feature = "tls")]
mod https_server;
mod lifecycle;

use axum::Router;
pub use error::{ServerError, ServerResult};
use http_server::serve_http;
#[cfg(feature = "tls")]
use https_server::serve_https;

use crate::config::ServerConfig;

/// Starts the server and runs it until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if:
/// - TLS certificates cannot be loaded (HTTPS mode)
/// - Cannot bind to the specified address/port
/// - Server encounters a fatal error during operation
pub async fn serve(app: Router, config: ServerConfig) -> ServerResult<()> {
    #[cfg(feature = "tls")]
    {
        if let (Some(cert_path), Some(key_path)) =
            (config.tls_cert_path.clone(), config.tls_key_path.clone())
        {
            return serve_https(app, config, cert_path, key_path).await;
        }
    }

    serve_http(app, config).await
}
