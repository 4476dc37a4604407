use crate::extractors::session_id::RequestSession;
use crate::params::event::{ListenParams, PublishParams};
use crate::response::event::listen_response;
use crate::Error;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use longpoll::checkpoint_from_raw;
use service::AppState;

use log::*;

/// GET the next batch of events for the calling session
#[utoipa::path(
    get,
    path = "/events/listen",
    params(ListenParams),
    responses(
        (status = 200, description = "A batch of events, or a heartbeat if none arrived in time", body = String),
        (status = 400, description = "Invalid callback name"),
        (status = 401, description = "Missing, unknown or expired session"),
        (status = 409, description = "The first event does not follow lastEventID; listen again without it"),
    ),
    security(
        ("session_id" = [])
    )
)]
pub async fn listen(
    RequestSession(session_id): RequestSession,
    State(app_state): State<AppState>,
    Query(params): Query<ListenParams>,
) -> Result<impl IntoResponse, Error> {
    let callback = params.callback()?;
    let checkpoint = checkpoint_from_raw(params.last_event_id);

    debug!(
        "GET listen for session {:?}, checkpoint {:?}",
        session_id, checkpoint
    );

    let response = app_state
        .manager()
        .listen(session_id.as_ref(), checkpoint)
        .await?;

    listen_response(&response, callback)
}

/// POST publish an event to a set of sessions
///
/// Internal producer surface: it carries no caller check and is meant for
/// trusted backend services, not browser clients. Keep it off public ingress.
#[utoipa::path(
    post,
    path = "/events",
    request_body = PublishParams,
    responses(
        (status = 202, description = "Event queued for every live receiver"),
        (status = 422, description = "Unprocessable Entity"),
    )
)]
pub async fn publish(
    State(app_state): State<AppState>,
    Json(params): Json<PublishParams>,
) -> impl IntoResponse {
    debug!(
        "POST publish event from {:?} to {} receiver(s)",
        params.pid,
        params.receivers.len()
    );

    app_state
        .event_publisher
        .publish(params.into_publication())
        .await;

    StatusCode::ACCEPTED
}
