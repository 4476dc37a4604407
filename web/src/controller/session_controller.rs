use crate::extractors::session_id::RequestSession;
use crate::{Error, WebErrorKind};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use events::SessionId;
use serde_json::json;
use service::AppState;

use log::*;

/// POST create a new session
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created; send its id in the x-session-id header", body = String),
    )
)]
pub async fn create(State(app_state): State<AppState>) -> impl IntoResponse {
    let session_id = app_state.sessions.create();
    (
        StatusCode::CREATED,
        Json(json!({ "session_id": session_id })),
    )
}

/// DELETE end the calling session and discard its pending events
#[utoipa::path(
    delete,
    path = "/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session id to end; must match the x-session-id header")
    ),
    responses(
        (status = 204, description = "Session ended"),
        (status = 401, description = "The x-session-id header is missing or names another session"),
        (status = 404, description = "Session not found"),
    ),
    security(
        ("session_id" = [])
    )
)]
pub async fn delete(
    RequestSession(caller): RequestSession,
    State(app_state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let session_id = SessionId::from(session_id);
    debug!("DELETE session {session_id}");

    // A session may only end itself.
    if caller.as_ref() != Some(&session_id) {
        warn!("Refusing to end session {session_id} on behalf of {caller:?}");
        return Err(Error {
            source: None,
            error_kind: WebErrorKind::Unauthorized,
        });
    }

    app_state.manager().remove_session(&session_id);
    if app_state.sessions.end(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
