use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Clip Trivia Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::stats::fleet_stats,
        crate::routes::stats::session_count,
        crate::routes::sse::event_stream,
        crate::routes::sessions::get_session,
        crate::routes::gateway::start_session,
        crate::routes::gateway::end_session,
        crate::routes::gateway::submit_guess,
        crate::routes::gateway::submit_vote,
        crate::routes::gateway::force_skip,
        crate::routes::gateway::join_team,
        crate::routes::gateway::update_presence,
        crate::routes::gateway::get_preferences,
        crate::routes::gateway::update_preferences,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::stats::FleetStatsResponse,
            crate::dto::stats::SessionCountResponse,
            crate::dto::session::SessionSnapshot,
            crate::dto::session::RoundSnapshot,
            crate::dto::gateway::StartSessionRequest,
            crate::dto::gateway::GuessRequest,
            crate::dto::gateway::VoteRequest,
            crate::dto::gateway::PlayerActionRequest,
            crate::dto::gateway::JoinTeamRequest,
            crate::dto::gateway::PresenceUpdateRequest,
            crate::dto::gateway::PreferencesPayload,
            crate::dto::gateway::GuessOutcome,
            crate::dto::gateway::VoteOutcome,
            crate::dto::gateway::IgnoredReason,
            crate::dto::gateway::TeamJoinResponse,
            crate::dto::gateway::ActionResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SessionStartedEvent,
            crate::dto::sse::RoundStartedEvent,
            crate::dto::sse::VoteProgressEvent,
            crate::dto::sse::HintRevealedEvent,
            crate::dto::sse::RoundEndedEvent,
            crate::dto::sse::SessionEndedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "stats", description = "Fleet-wide load"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "sessions", description = "Read-only session snapshots"),
        (name = "gateway", description = "Platform events forwarded by the chat gateway"),
    )
)]
pub struct ApiDoc;
