//! Wire format for long-poll responses.
//!
//! A batch is `{"data": [{"pid"?, "messageid", "data"}, ...], "id": <last messageid>}`,
//! a heartbeat is `{"type": "heartbeat"}`. Either may be wrapped as
//! `callback(<json>);` for script-tag polling.

use crate::Result;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use events::Event;
use longpoll::ListenResponse;
use serde::Serialize;
use serde_json::Value;

const JSON_CONTENT_TYPE: &str = "application/json";
const SCRIPT_CONTENT_TYPE: &str = "text/javascript";

/// Heartbeat marker clients can tell apart from a batch.
pub(crate) const HEARTBEAT_TYPE: &str = "heartbeat";

#[derive(Debug, Serialize)]
struct WireEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pid: Option<&'a str>,
    messageid: u64,
    data: &'a Value,
}

impl<'a> From<&'a Event> for WireEvent<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            pid: event.producer_id(),
            messageid: event.sequence_number(),
            data: event.payload(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ListenBody<'a> {
    Batch {
        data: Vec<WireEvent<'a>>,
        id: u64,
    },
    Heartbeat {
        #[serde(rename = "type")]
        kind: &'static str,
    },
}

impl<'a> From<&'a ListenResponse> for ListenBody<'a> {
    fn from(response: &'a ListenResponse) -> Self {
        match response {
            ListenResponse::Batch(batch) => ListenBody::Batch {
                data: batch.events.iter().map(WireEvent::from).collect(),
                id: batch.last_event_id,
            },
            ListenResponse::Heartbeat => ListenBody::Heartbeat {
                kind: HEARTBEAT_TYPE,
            },
        }
    }
}

/// Serialize a listen result, wrapped in `callback(...)` when one was given.
/// `callback` must already be validated.
pub(crate) fn listen_response(response: &ListenResponse, callback: Option<&str>) -> Result<Response> {
    let json = serde_json::to_string(&ListenBody::from(response))?;

    let (content_type, body) = match callback {
        Some(callback) => (SCRIPT_CONTENT_TYPE, format!("{callback}({json});")),
        None => (JSON_CONTENT_TYPE, json),
    };

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, content_type)],
        body,
    )
        .into_response())
}
