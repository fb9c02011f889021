//! Role-sync queue abstraction.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{Result, TRACING_TARGET};

/// A request to reconcile one user's Discord roles with their course roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSyncRequest {
    /// Discord user id.
    pub discord_user_id: String,
    /// Guild to sync; all linked guilds when absent.
    pub guild_id: Option<String>,
}

impl RoleSyncRequest {
    /// Creates a request for a user, optionally scoped to one guild.
    pub fn new(discord_user_id: impl Into<String>, guild_id: Option<String>) -> Self {
        Self {
            discord_user_id: discord_user_id.into(),
            guild_id,
        }
    }
}

/// Backend that accepts role-sync requests.
///
/// Implement this trait to plug in the queue that performs the sync.
#[async_trait::async_trait]
pub trait RoleSyncQueue: Send + Sync {
    /// Enqueues a role sync.
    async fn enqueue(&self, request: &RoleSyncRequest) -> Result<()>;
}

/// Shared handle to a [`RoleSyncQueue`].
#[derive(Clone)]
pub struct RoleSyncService {
    inner: Arc<dyn RoleSyncQueue>,
}

impl fmt::Debug for RoleSyncService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleSyncService").finish_non_exhaustive()
    }
}

impl RoleSyncService {
    /// Wraps a queue backend.
    pub fn new<Q>(queue: Q) -> Self
    where
        Q: RoleSyncQueue + 'static,
    {
        Self {
            inner: Arc::new(queue),
        }
    }

    /// Enqueues a role sync.
    pub async fn enqueue(&self, request: &RoleSyncRequest) -> Result<()> {
        let result = self.inner.enqueue(request).await;

        match &result {
            Ok(()) => tracing::info!(
                target: TRACING_TARGET,
                discord_user_id = %request.discord_user_id,
                guild_id = ?request.guild_id,
                "Role sync enqueued"
            ),
            Err(error) => tracing::error!(
                target: TRACING_TARGET,
                discord_user_id = %request.discord_user_id,
                guild_id = ?request.guild_id,
                error = %error,
                "Failed to enqueue role sync"
            ),
        }

        result
    }
}
