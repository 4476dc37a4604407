use crate::Error;
use events::{EventTemplate, Publication, SessionId};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// Longest callback name accepted for script-tag delivery.
const MAX_CALLBACK_LEN: usize = 128;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct ListenParams {
    /// Last event id the client received. Absent or negative skips the gap check.
    #[serde(rename = "lastEventID")]
    pub(crate) last_event_id: Option<i64>,
    /// Wrap the response as `callback(<json>);` for script-tag polling.
    pub(crate) callback: Option<String>,
}

impl ListenParams {
    /// The requested callback, if it is a plain (dotted) JavaScript identifier.
    pub(crate) fn callback(&self) -> Result<Option<&str>, Error> {
        match self.callback.as_deref() {
            None => Ok(None),
            Some(name) if is_valid_callback(name) => Ok(Some(name)),
            Some(name) => Err(Error::invalid_callback(name)),
        }
    }
}

fn is_valid_callback(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_CALLBACK_LEN {
        return false;
    }

    name.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => chars
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
            _ => false,
        }
    })
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct PublishParams {
    /// Identifier of the producing process, echoed to listeners as `pid`.
    pub(crate) pid: Option<String>,
    /// Opaque event payload.
    #[schema(value_type = Object)]
    pub(crate) data: Value,
    /// Session ids that should receive the event.
    pub(crate) receivers: Vec<String>,
}

impl PublishParams {
    pub(crate) fn into_publication(self) -> Publication {
        Publication {
            template: EventTemplate {
                producer_id: self.pid,
                payload: self.data,
            },
            receivers: self.receivers.into_iter().map(SessionId::from).collect(),
        }
    }
}
