//! Discord interaction and webhook event endpoints.
//!
//! Both endpoints only see payloads whose signature was verified by
//! [`DiscordPayload`]; unverified requests never reach the role sync queue.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pawtograder_discord::{
    EventOutcome, Interaction, InteractionOutcome, InteractionResponse, RoleSyncService,
    WebhookEvent, handle_event, handle_interaction,
};

use crate::TRACING_TARGET_DISCORD;
use crate::extract::DiscordPayload;
use crate::handler::Result;
use crate::handler::response::Received;
use crate::service::ServiceState;

/// Answers a Discord interaction.
#[tracing::instrument(skip_all, fields(interaction_type = interaction.type_code))]
async fn interactions(
    State(role_sync): State<RoleSyncService>,
    DiscordPayload(interaction): DiscordPayload<Interaction>,
) -> Result<Response> {
    let outcome = handle_interaction(&interaction, &role_sync).await?;

    tracing::debug!(
        target: TRACING_TARGET_DISCORD,
        outcome = ?outcome,
        "Interaction handled"
    );

    let response = match outcome {
        InteractionOutcome::Pong => Json(InteractionResponse::pong()).into_response(),
        InteractionOutcome::Reply(reply) => Json(reply).into_response(),
        InteractionOutcome::Ignored => Json(Received::default()).into_response(),
    };

    Ok(response)
}

/// Acknowledges a Discord webhook event.
#[tracing::instrument(skip_all, fields(webhook_type = event.type_code))]
async fn webhooks(
    State(role_sync): State<RoleSyncService>,
    DiscordPayload(event): DiscordPayload<WebhookEvent>,
) -> Result<Response> {
    let outcome = handle_event(&event, &role_sync).await?;

    tracing::debug!(
        target: TRACING_TARGET_DISCORD,
        outcome = ?outcome,
        "Webhook event handled"
    );

    let response = match outcome {
        EventOutcome::Ping | EventOutcome::Accepted => StatusCode::NO_CONTENT.into_response(),
        EventOutcome::Ignored => Json(Received::default()).into_response(),
    };

    Ok(response)
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/api/discord/interactions", post(interactions))
        .route("/api/discord/webhooks", post(webhooks))
}
