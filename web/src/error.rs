use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

use longpoll::{Error as LongPollError, ErrorKind as LongPollErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

/// Web layer error. Holds the kind used to pick a status code and the
/// original error, if any, for logging.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    Unauthorized,
    OutOfSync,
    Cancelled,
    InvalidCallback,
    Serialization,
}

impl Error {
    pub fn invalid_callback(callback: &str) -> Self {
        Error {
            source: Some(format!("invalid callback name: {callback:?}").into()),
            error_kind: WebErrorKind::InvalidCallback,
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response(),
            WebErrorKind::OutOfSync => (StatusCode::CONFLICT, "OUT OF SYNC").into_response(),
            WebErrorKind::Cancelled => {
                (StatusCode::REQUEST_TIMEOUT, "REQUEST TIMEOUT").into_response()
            }
            WebErrorKind::InvalidCallback => {
                (StatusCode::BAD_REQUEST, "INVALID CALLBACK").into_response()
            }
            WebErrorKind::Serialization => {
                error!("Failed to serialize response: {:?}", self.source);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl From<LongPollError> for Error {
    fn from(err: LongPollError) -> Self {
        let error_kind = match err.error_kind {
            LongPollErrorKind::Unauthorized(_) => WebErrorKind::Unauthorized,
            LongPollErrorKind::OutOfSync { .. } => WebErrorKind::OutOfSync,
            LongPollErrorKind::Cancelled => WebErrorKind::Cancelled,
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::Serialization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longpoll::UnauthorizedReason;

    #[test]
    fn engine_errors_map_to_status_codes() {
        let cases = [
            (
                longpoll::error::unauthorized(UnauthorizedReason::NotAlive),
                StatusCode::UNAUTHORIZED,
            ),
            (longpoll::error::out_of_sync(4, 5), StatusCode::CONFLICT),
            (longpoll::error::cancelled(), StatusCode::REQUEST_TIMEOUT),
        ];

        for (engine_error, status) in cases {
            let response = Error::from(engine_error).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn invalid_callback_is_a_bad_request() {
        let response = Error::invalid_callback("alert(1)").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
