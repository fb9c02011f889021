#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};

/// Tracing target for request authentication.
pub const TRACING_TARGET_AUTHENTICATION: &str = "pawtograder_server::authentication";

/// Tracing target for service initialization.
pub const TRACING_TARGET_SERVICE: &str = "pawtograder_server::service";

/// Tracing target for grader retrieval.
pub const TRACING_TARGET_GRADERS: &str = "pawtograder_server::graders";

/// Tracing target for Discord callbacks.
pub const TRACING_TARGET_DISCORD: &str = "pawtograder_server::discord";
