//! Request extractors.
//!
//! - [`ActionsIdentity`]: a verified GitHub Actions ID token from the
//!   `Authorization` header.
//! - [`DiscordPayload`]: a JSON body whose Ed25519 signature has been checked.
//!
//! Both reject with the server's JSON error model.

mod actions_identity;
mod discord_payload;

pub use crate::extract::actions_identity::ActionsIdentity;
pub use crate::extract::discord_payload::DiscordPayload;
