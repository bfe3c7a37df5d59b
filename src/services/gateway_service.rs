//! Entry points for platform events forwarded by the chat gateway.
//!
//! Each call is routed to the worker owning the guild; the worker processes it in
//! order with the guild's other events.

use tracing::{debug, info};

use crate::{
    dao::preferences::PreferenceStore,
    dto::{
        gateway::{
            ActionResponse, GuessOutcome, GuessRequest, JoinTeamRequest, PlayerActionRequest,
            PreferencesPayload, PresenceUpdateRequest, StartSessionRequest, TeamJoinResponse,
            VoteOutcome, VoteRequest,
        },
        session::SessionSnapshot,
        sse::SessionEndedEvent,
    },
    error::ServiceError,
    state::{SharedState, game::GameMode},
};

/// Start a session in `guild_id`.
pub async fn start_session(
    state: &SharedState,
    guild_id: String,
    request: StartSessionRequest,
) -> Result<SessionSnapshot, ServiceError> {
    let starting_lives = match request.mode {
        GameMode::Elimination => request.lives.or(Some(state.config().elimination_lives)),
        _ => None,
    };
    state
        .worker_for(&guild_id)
        .start_session(guild_id, request.owner_id, request.mode, starting_lives)
        .await
}

/// End the session of `guild_id` and return its final summary.
pub async fn end_session(
    state: &SharedState,
    guild_id: String,
) -> Result<SessionEndedEvent, ServiceError> {
    state.worker_for(&guild_id).end_session(guild_id).await
}

/// Submit a guess.
pub async fn guess(
    state: &SharedState,
    guild_id: String,
    request: GuessRequest,
) -> Result<GuessOutcome, ServiceError> {
    state
        .worker_for(&guild_id)
        .guess(guild_id, request.player_id, request.content)
        .await
}

/// Submit a skip or hint vote.
pub async fn vote(
    state: &SharedState,
    guild_id: String,
    request: VoteRequest,
) -> Result<VoteOutcome, ServiceError> {
    state
        .worker_for(&guild_id)
        .vote(guild_id, request.player_id, request.action)
        .await
}

/// Owner-only skip of the current round.
pub async fn force_skip(
    state: &SharedState,
    guild_id: String,
    request: PlayerActionRequest,
) -> Result<VoteOutcome, ServiceError> {
    state
        .worker_for(&guild_id)
        .force_skip(guild_id, request.player_id)
        .await
}

/// Join or switch team in a team session.
pub async fn join_team(
    state: &SharedState,
    guild_id: String,
    request: JoinTeamRequest,
) -> Result<TeamJoinResponse, ServiceError> {
    state
        .worker_for(&guild_id)
        .join_team(guild_id, request.player_id, request.team)
        .await?
        .map(TeamJoinResponse::from)
        .ok_or_else(|| ServiceError::InvalidInput("the session does not use team scoring".into()))
}

/// Track a player entering or leaving a guild's voice channel.
pub fn update_presence(state: &SharedState, request: PresenceUpdateRequest) -> ActionResponse {
    let PresenceUpdateRequest {
        guild_id,
        player_id,
        joined,
        bot,
    } = request;

    if joined {
        if state.presence().join(&guild_id, &player_id, bot) {
            debug!(guild_id, player_id, "player joined voice channel");
            state
                .worker_for(&guild_id)
                .notify_player_joined(guild_id, player_id);
        }
    } else if state.presence().leave(&guild_id, &player_id) {
        debug!(guild_id, player_id, "player left voice channel");
        state
            .worker_for(&guild_id)
            .notify_player_left(guild_id, player_id);
    }

    ActionResponse {
        message: "presence updated".into(),
    }
}

/// Current preferences of a guild.
pub async fn preferences(
    state: &SharedState,
    guild_id: &str,
) -> Result<PreferencesPayload, ServiceError> {
    let preferences = state.preferences().preferences(guild_id).await?;
    Ok(preferences.into())
}

/// Replace the preferences of a guild. Applies from the next round on.
pub async fn update_preferences(
    state: &SharedState,
    guild_id: &str,
    payload: PreferencesPayload,
) -> Result<PreferencesPayload, ServiceError> {
    state
        .preferences()
        .save_preferences(guild_id, payload.clone().into())
        .await?;
    info!(guild_id, "guild preferences updated");
    Ok(payload)
}
