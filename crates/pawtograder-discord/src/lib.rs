#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod dispatch;
mod error;
mod event;
mod interaction;
mod role_sync;
mod verify;

pub use config::DiscordConfig;
pub use dispatch::{EventOutcome, InteractionOutcome, handle_event, handle_interaction};
pub use error::{BoxedError, Error, Result};
pub use event::{ApplicationAuthorized, EventBody, Guild, WebhookEvent, WebhookEventType};
pub use interaction::{
    CommandData, Interaction, InteractionResponse, InteractionResponseData, InteractionType,
    Member, User,
};
pub use role_sync::{RoleSyncQueue, RoleSyncRequest, RoleSyncService};
pub use verify::{DiscordVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// Tracing target for Discord operations.
pub const TRACING_TARGET: &str = "pawtograder_discord";

/// Name of the slash command that requests a role sync.
pub const SYNC_ROLES_COMMAND: &str = "sync-roles";
