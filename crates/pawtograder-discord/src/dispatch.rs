//! Routing of verified interactions and webhook events.

use crate::event::ApplicationAuthorized;
use crate::{
    Interaction, InteractionResponse, InteractionType, Result, RoleSyncRequest, RoleSyncService,
    SYNC_ROLES_COMMAND, TRACING_TARGET, WebhookEvent, WebhookEventType,
};

/// Reply shown to a user who ran the sync command.
const SYNC_ROLES_REPLY: &str = "Your course roles will be synced to this server shortly.";

/// What to answer to an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionOutcome {
    /// Answer with `PONG`.
    Pong,
    /// Answer with the given response.
    Reply(InteractionResponse),
    /// Acknowledge without acting.
    Ignored,
}

/// What to answer to a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Endpoint validation ping.
    Ping,
    /// The event was acted on.
    Accepted,
    /// Acknowledge without acting.
    Ignored,
}

/// Handles a verified interaction.
pub async fn handle_interaction(
    interaction: &Interaction,
    role_sync: &RoleSyncService,
) -> Result<InteractionOutcome> {
    if interaction.kind() == InteractionType::Ping {
        return Ok(InteractionOutcome::Pong);
    }

    let (Some(SYNC_ROLES_COMMAND), Some(guild_id), Some(member)) = (
        interaction.command_name(),
        interaction.guild_id.as_ref(),
        interaction.member.as_ref(),
    ) else {
        tracing::debug!(
            target: TRACING_TARGET,
            interaction_type = interaction.type_code,
            command = ?interaction.command_name(),
            "Ignoring interaction"
        );
        return Ok(InteractionOutcome::Ignored);
    };

    let request = RoleSyncRequest::new(member.user.id.clone(), Some(guild_id.clone()));
    role_sync.enqueue(&request).await?;

    Ok(InteractionOutcome::Reply(InteractionResponse::ephemeral(
        SYNC_ROLES_REPLY,
    )))
}

/// Handles a verified webhook event.
pub async fn handle_event(event: &WebhookEvent, role_sync: &RoleSyncService) -> Result<EventOutcome> {
    match event.kind() {
        WebhookEventType::Ping => return Ok(EventOutcome::Ping),
        WebhookEventType::Event => {}
        WebhookEventType::Unknown(code) => {
            tracing::debug!(target: TRACING_TARGET, type_code = code, "Ignoring webhook envelope");
            return Ok(EventOutcome::Ignored);
        }
    }

    let Some(body) = event
        .event
        .as_ref()
        .filter(|body| body.event_type == WebhookEvent::APPLICATION_AUTHORIZED)
    else {
        tracing::debug!(
            target: TRACING_TARGET,
            event_type = ?event.event_type(),
            "Ignoring webhook event"
        );
        return Ok(EventOutcome::Ignored);
    };

    let data = body.data.clone().unwrap_or_default();
    let authorized: ApplicationAuthorized = serde_json::from_value(data)?;

    let request = RoleSyncRequest::new(
        authorized.user.id,
        authorized.guild.map(|guild| guild.id),
    );
    role_sync.enqueue(&request).await?;

    Ok(EventOutcome::Accepted)
}
