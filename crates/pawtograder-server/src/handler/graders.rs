//! Grader tarball retrieval for grading workflows.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use pawtograder_github::{GraderArtifactCache, InstallationRegistry};

use crate::TRACING_TARGET_GRADERS;
use crate::extract::ActionsIdentity;
use crate::handler::response::Grader;
use crate::handler::{ErrorKind, Result};
use crate::service::{GraderLookup, ServiceState};

/// Returns a signed download URL for the grader of the calling repository.
///
/// The grader repository is looked up for the repository named in the
/// caller's ID token, then fetched through the installation of the grader's
/// owner. The tarball is built on first use of a commit and served from
/// storage afterwards.
#[tracing::instrument(skip_all, fields(repository = %identity.repository()))]
async fn fetch_grader(
    State(grader_lookup): State<GraderLookup>,
    State(installations): State<InstallationRegistry>,
    State(artifact_cache): State<GraderArtifactCache>,
    identity: ActionsIdentity,
) -> Result<Json<Grader>> {
    let repository = identity.repository();

    let grader = grader_lookup
        .grader_repository(repository)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                target: TRACING_TARGET_GRADERS,
                repository = %repository,
                "No grader configured for repository"
            );

            ErrorKind::NotFound
                .with_message("No grader configured for this repository")
                .with_resource("grader")
                .with_context(format!("repository: {repository}"))
        })?;

    let client = installations.for_repository(&grader)?;
    let artifact = artifact_cache.fetch(client, &grader).await?;

    tracing::info!(
        target: TRACING_TARGET_GRADERS,
        repository = %repository,
        grader = %grader,
        grader_sha = %artifact.sha,
        cached = artifact.cached,
        run_id = ?identity.claims().run_id,
        "Grader served"
    );

    Ok(Json(Grader::from(artifact)))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/api/autograder/grader", post(fetch_grader))
}
