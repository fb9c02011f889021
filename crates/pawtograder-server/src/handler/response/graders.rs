//! Grader response types.

use pawtograder_github::GraderArtifact;
use serde::{Deserialize, Serialize};

/// Signed download of a grader tarball.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grader {
    /// Short-lived download URL of the tarball.
    pub grader_url: String,
    /// Commit of the grader repository the tarball was built from.
    pub grader_sha: String,
    /// Seconds until `grader_url` stops working.
    pub expires_in_secs: u64,
}

impl From<GraderArtifact> for Grader {
    fn from(artifact: GraderArtifact) -> Self {
        Self {
            grader_url: artifact.url.url,
            grader_sha: artifact.sha,
            expires_in_secs: artifact.url.expires_in.as_secs(),
        }
    }
}
