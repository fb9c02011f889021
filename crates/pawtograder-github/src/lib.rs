#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod app;
mod artifact;
mod config;
mod error;
mod installation;
mod oidc;
mod registry;
mod repository;

pub use app::{Account, GitHubApp, Installation, InstallationToken};
pub use artifact::{
    ArtifactStore, GraderArtifact, GraderArtifactCache, GraderRepositoryLookup, RepositorySource,
    SIGNED_URL_TTL, artifact_key,
};
pub use config::{GitHubConfig, OidcConfig};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use installation::{GitObject, GitRef, InstallationClient, Repository};
pub use oidc::{
    GITHUB_ACTIONS_ISSUER, GRADING_WORKFLOW_SUFFIX, OidcClaims, OidcVerifier, check_workflow_ref,
};
pub use registry::InstallationRegistry;
pub use repository::RepositoryName;

/// Tracing target for GitHub operations.
pub const TRACING_TARGET: &str = "pawtograder_github";

/// Tracing target for OIDC token verification.
pub const TRACING_TARGET_OIDC: &str = "pawtograder_github::oidc";

/// Tracing target for the grader artifact cache.
pub const TRACING_TARGET_ARTIFACT: &str = "pawtograder_github::artifact";
