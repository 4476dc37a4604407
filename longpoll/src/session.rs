//! Hooks the engine consults about a session before touching its queue.
//!
//! Both are supplied by the embedding application: liveness usually comes from
//! the session layer, authorization from whatever decides who may listen.

use events::SessionId;

/// Reports whether a session is still alive.
pub trait SessionLiveness: Send + Sync {
    fn is_alive(&self, session_id: &SessionId) -> bool;
}

/// Decides whether a session may listen for events.
pub trait SessionAuthorization: Send + Sync {
    fn is_session_allowed(&self, session_id: &SessionId) -> bool;
}
