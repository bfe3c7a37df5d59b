use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        gateway::{
            ActionResponse, GuessOutcome, GuessRequest, JoinTeamRequest, PlayerActionRequest,
            PreferencesPayload, PresenceUpdateRequest, StartSessionRequest, TeamJoinResponse,
            VoteOutcome, VoteRequest,
        },
        session::SessionSnapshot,
        sse::SessionEndedEvent,
    },
    error::AppError,
    routes::guild_path,
    services::gateway_service,
    state::SharedState,
};

/// Endpoints through which the chat gateway forwards platform events.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route(
            "/gateway/sessions/{guild_id}",
            post(start_session).delete(end_session),
        )
        .route("/gateway/sessions/{guild_id}/guesses", post(submit_guess))
        .route("/gateway/sessions/{guild_id}/votes", post(submit_vote))
        .route("/gateway/sessions/{guild_id}/force-skip", post(force_skip))
        .route("/gateway/sessions/{guild_id}/teams", post(join_team))
        .route("/gateway/presence", post(update_presence))
        .route(
            "/gateway/guilds/{guild_id}/preferences",
            get(get_preferences).put(update_preferences),
        )
}

/// Start a session in a guild and schedule its first round.
#[utoipa::path(
    post,
    path = "/gateway/sessions/{guild_id}",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionSnapshot),
        (status = 409, description = "A session is already active in the guild")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<StartSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let guild_id = guild_path(guild_id)?;
    let snapshot = gateway_service::start_session(&state, guild_id, payload).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// End the session of a guild, returning the final scoreboard.
#[utoipa::path(
    delete,
    path = "/gateway/sessions/{guild_id}",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    responses(
        (status = 200, description = "Session ended", body = SessionEndedEvent),
        (status = 404, description = "No session in the guild")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
) -> Result<Json<SessionEndedEvent>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(gateway_service::end_session(&state, guild_id).await?))
}

/// Submit a guess for the current round.
#[utoipa::path(
    post,
    path = "/gateway/sessions/{guild_id}/guesses",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = GuessRequest,
    responses((status = 200, description = "Guess resolved", body = GuessOutcome))
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<GuessOutcome>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(gateway_service::guess(&state, guild_id, payload).await?))
}

/// Vote to skip the round or reveal a hint.
#[utoipa::path(
    post,
    path = "/gateway/sessions/{guild_id}/votes",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = VoteRequest,
    responses((status = 200, description = "Vote counted", body = VoteOutcome))
)]
pub async fn submit_vote(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<VoteOutcome>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(gateway_service::vote(&state, guild_id, payload).await?))
}

/// Skip the round without a vote. Only the session owner may do this.
#[utoipa::path(
    post,
    path = "/gateway/sessions/{guild_id}/force-skip",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = PlayerActionRequest,
    responses((status = 200, description = "Skip applied or ignored", body = VoteOutcome))
)]
pub async fn force_skip(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<VoteOutcome>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(
        gateway_service::force_skip(&state, guild_id, payload).await?,
    ))
}

/// Join or switch team in a team session.
#[utoipa::path(
    post,
    path = "/gateway/sessions/{guild_id}/teams",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = JoinTeamRequest,
    responses(
        (status = 200, description = "Team membership updated", body = TeamJoinResponse),
        (status = 400, description = "The session does not use team scoring")
    )
)]
pub async fn join_team(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinTeamRequest>>,
) -> Result<Json<TeamJoinResponse>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(
        gateway_service::join_team(&state, guild_id, payload).await?,
    ))
}

/// Report a player entering or leaving a guild's voice channel.
#[utoipa::path(
    post,
    path = "/gateway/presence",
    tag = "gateway",
    request_body = PresenceUpdateRequest,
    responses((status = 200, description = "Presence recorded", body = ActionResponse))
)]
pub async fn update_presence(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<PresenceUpdateRequest>>,
) -> Json<ActionResponse> {
    Json(gateway_service::update_presence(&state, payload))
}

/// Read a guild's preferences.
#[utoipa::path(
    get,
    path = "/gateway/guilds/{guild_id}/preferences",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    responses((status = 200, description = "Current preferences", body = PreferencesPayload))
)]
pub async fn get_preferences(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
) -> Result<Json<PreferencesPayload>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(gateway_service::preferences(&state, &guild_id).await?))
}

/// Replace a guild's preferences; they apply from the next round.
#[utoipa::path(
    put,
    path = "/gateway/guilds/{guild_id}/preferences",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    request_body = PreferencesPayload,
    responses((status = 200, description = "Preferences saved", body = PreferencesPayload))
)]
pub async fn update_preferences(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
    Valid(Json(payload)): Valid<Json<PreferencesPayload>>,
) -> Result<Json<PreferencesPayload>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(
        gateway_service::update_preferences(&state, &guild_id, payload).await?,
    ))
}
