use crate::controller::{event_controller, health_check_controller, session_controller};
use crate::extractors::session_id::SESSION_ID_HEADER;
use crate::params;
use axum::{
    routing::{delete, get, post},
    Router,
};
use service::AppState;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Long-poll Events API"
        ),
        paths(
            event_controller::listen,
            event_controller::publish,
            health_check_controller::health_check,
            session_controller::create,
            session_controller::delete,
        ),
        components(
            schemas(
                params::event::PublishParams,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "longpoll_server", description = "Long-poll event delivery")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Listening requires the session id issued by `POST /sessions`, sent as a header.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    SESSION_ID_HEADER,
                    "Session id value returned from POST /sessions",
                ))),
            )
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(event_routes(app_state.clone()))
        .merge(health_routes())
        .merge(session_routes(app_state))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn event_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/events", post(event_controller::publish))
        .route("/events/listen", get(event_controller::listen))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn session_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(session_controller::create))
        .route("/sessions/:session_id", delete(session_controller::delete))
        .with_state(app_state)
}
