use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use events::SessionId;
use log::*;
use std::convert::Infallible;

/// Header a client uses to name its session.
pub const SESSION_ID_HEADER: &str = "x-session-id";

/// The session named by the request, if it named one.
///
/// Never rejects: a request without a usable session id is passed on as
/// `None` and the long-poll engine answers it as unauthorized.
pub(crate) struct RequestSession(pub Option<SessionId>);

#[async_trait]
impl<S> FromRequestParts<S> for RequestSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session_id = parts
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(SessionId::from);

        if session_id.is_none() {
            trace!("Request carries no {SESSION_ID_HEADER} header");
        }

        Ok(RequestSession(session_id))
    }
}
