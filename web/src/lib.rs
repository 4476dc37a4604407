//! HTTP transport for the long-poll engine.
//!
//! Thin axum layer: it reads the session id header and query parameters,
//! calls into `longpoll::Manager` and renders the result as JSON (or a
//! script-tag callback). Ordering, waiting and gap detection all live in the
//! `longpoll` crate.

use axum::http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method};
use log::*;
use service::AppState;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod error;
mod extractors;
mod params;
mod response;
mod router;

pub use error::{Error, Result, WebErrorKind};
pub use extractors::session_id::SESSION_ID_HEADER;
pub use router::define_routes;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin:?}: {e}");
                None
            }
        })
        .collect();

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::DELETE, Method::GET, Method::OPTIONS, Method::POST])
        .allow_credentials(true)
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(SESSION_ID_HEADER)])
        .allow_origin(allowed_origins);

    let listener = TcpListener::bind(&server_url).await?;
    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, define_routes(app_state).layer(cors_layer)).await
}
