//! Interaction payloads.
//!
//! Only the fields this service reads are modelled; unknown fields are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Interaction type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl From<u8> for InteractionType {
    fn from(code: u8) -> Self {
        match code {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

/// A Discord user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Snowflake id.
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A guild member. Present on interactions sent from a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
}

/// Application command data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandData {
    /// Command id.
    #[serde(default)]
    pub id: Option<String>,
    /// Command name.
    pub name: String,
}

/// An incoming interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id.
    #[serde(default)]
    pub id: Option<String>,
    /// Raw interaction type code, see [`Interaction::kind`].
    #[serde(rename = "type")]
    pub type_code: u8,
    #[serde(default)]
    pub application_id: Option<String>,
    /// Guild the interaction was sent from.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Invoking member, for guild interactions.
    #[serde(default)]
    pub member: Option<Member>,
    /// Invoking user, for direct-message interactions.
    #[serde(default)]
    pub user: Option<User>,
    /// Command data, for application commands.
    #[serde(default)]
    pub data: Option<CommandData>,
}

impl Interaction {
    /// Returns the interaction type.
    pub fn kind(&self) -> InteractionType {
        InteractionType::from(self.type_code)
    }

    /// Returns the invoked command name, if this is an application command.
    pub fn command_name(&self) -> Option<&str> {
        match self.kind() {
            InteractionType::ApplicationCommand => self.data.as_ref().map(|d| d.name.as_str()),
            _ => None,
        }
    }
}

/// Response body for an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub type_code: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionResponseData>,
}

/// Message content of an interaction response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResponseData {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl InteractionResponse {
    /// `PONG` response type.
    pub const PONG: u8 = 1;
    /// `CHANNEL_MESSAGE_WITH_SOURCE` response type.
    pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;
    /// Message flag that shows the reply only to the invoking user.
    pub const EPHEMERAL: u64 = 1 << 6;

    /// Answers a `PING`.
    pub fn pong() -> Self {
        Self {
            type_code: Self::PONG,
            data: None,
        }
    }

    /// Replies with a message only the invoking user can see.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            type_code: Self::CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(InteractionResponseData {
                content: content.into(),
                flags: Some(Self::EPHEMERAL),
            }),
        }
    }
}
