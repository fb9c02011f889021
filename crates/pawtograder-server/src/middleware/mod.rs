//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Recovery: request timeouts, handler panics and tower errors become JSON
//!   error responses.
//! - Observability: request IDs, tracing spans and request timing.
//! - Security: CORS, response security headers and body size limits.
//!
//! ```rust,ignore
//! use pawtograder_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! let app = routes()
//!     .with_state(state)
//!     .with_default_security()
//!     .with_observability()
//!     .with_default_recovery();
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::{REQUEST_ID_HEADER, RouterObservabilityExt, track_request_metrics};
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, DEFAULT_MAX_BODY_SIZE, RouterSecurityExt};
