//! Database functions used by the grading gateway.

use pawtograder_discord::{RoleSyncQueue, RoleSyncRequest};
use pawtograder_github::{GraderRepositoryLookup, RepositoryName};
use serde::Serialize;

use crate::{SupabaseClient, TRACING_TARGET};

const ENQUEUE_DISCORD_ROLE_SYNC: &str = "enqueue_discord_role_sync";
const GET_GRADER_REPOSITORY: &str = "get_grader_repository";

#[derive(Serialize)]
struct EnqueueRoleSyncArgs<'a> {
    p_discord_user_id: &'a str,
    p_guild_id: Option<&'a str>,
}

#[derive(Serialize)]
struct GraderRepositoryArgs<'a> {
    p_repository: &'a str,
}

#[async_trait::async_trait]
impl RoleSyncQueue for SupabaseClient {
    async fn enqueue(&self, request: &RoleSyncRequest) -> pawtograder_discord::Result<()> {
        let args = EnqueueRoleSyncArgs {
            p_discord_user_id: &request.discord_user_id,
            p_guild_id: request.guild_id.as_deref(),
        };

        self.rpc_void(ENQUEUE_DISCORD_ROLE_SYNC, &args).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl GraderRepositoryLookup for SupabaseClient {
    async fn grader_repository(
        &self,
        repository: &RepositoryName,
    ) -> pawtograder_github::Result<Option<RepositoryName>> {
        let full_name = repository.to_string();
        let args = GraderRepositoryArgs {
            p_repository: &full_name,
        };

        let grader: Option<String> = self.rpc(GET_GRADER_REPOSITORY, &args).await?;

        tracing::debug!(
            target: TRACING_TARGET,
            repository = %repository,
            grader = ?grader,
            "Resolved grader repository"
        );

        grader.map(|name| name.parse()).transpose()
    }
}
