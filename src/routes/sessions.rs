use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::session::SessionSnapshot,
    error::AppError,
    routes::guild_path,
    services::public_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sessions/{guild_id}",
    tag = "sessions",
    params(("guild_id" = String, Path, description = "Guild identifier")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 404, description = "No session in the guild")
    )
)]
/// Read-only view of the session running in a guild.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(guild_id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let guild_id = guild_path(guild_id)?;
    Ok(Json(public_service::session_snapshot(&state, guild_id).await?))
}

/// Configure the session routes.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sessions/{guild_id}", get(get_session))
}
