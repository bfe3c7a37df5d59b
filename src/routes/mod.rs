use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    dto::validation::validate_opaque_id, error::AppError, services::documentation::ApiDoc,
    state::SharedState,
};

pub mod gateway;
pub mod health;
pub mod sessions;
pub mod sse;
pub mod stats;

/// Compose all route trees with the Swagger UI served at `/docs`.
pub fn router(state: SharedState) -> Router<()> {
    let swagger: Router<SharedState> = SwaggerUi::new("/docs")
        .url("/api-doc/openapi.json", ApiDoc::openapi())
        .into();

    health::router()
        .merge(stats::router())
        .merge(sse::router())
        .merge(sessions::router())
        .merge(gateway::router())
        .merge(swagger)
        .with_state(state)
}

/// Validate a guild id taken from the request path.
fn guild_path(guild_id: String) -> Result<String, AppError> {
    validate_opaque_id(&guild_id)
        .map_err(|err| AppError::BadRequest(format!("invalid guild id: {err}")))?;
    Ok(guild_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guild_ids_from_paths_are_validated() {
        assert_eq!(guild_path("80351110224678912".into()).unwrap(), "80351110224678912");
        assert!(matches!(
            guild_path("bad guild".into()),
            Err(AppError::BadRequest(_))
        ));
    }
}
