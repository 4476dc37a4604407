use dashmap::DashMap;
use events::SessionId;
use log::*;
use longpoll::{SessionAuthorization, SessionLiveness};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// In-memory session store.
///
/// A session is allowed to listen while the store knows it, and alive until it
/// is ended or outlives `expiry`. Expired sessions are forgotten by
/// [`SessionStore::sweep_expired`].
pub struct SessionStore {
    sessions: DashMap<SessionId, Instant>,
    expiry: Duration,
}

impl SessionStore {
    pub fn new(expiry: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            expiry,
        }
    }

    /// Issue a new session id.
    pub fn create(&self) -> SessionId {
        let session_id = SessionId::new(uuid::Uuid::new_v4().to_string());
        self.sessions.insert(session_id.clone(), Instant::now());
        info!("Created session {}", session_id);
        session_id
    }

    /// End a session. Returns whether it existed.
    pub fn end(&self, session_id: &SessionId) -> bool {
        let existed = self.sessions.remove(session_id).is_some();
        if existed {
            info!("Ended session {}", session_id);
        }
        existed
    }

    /// Forget every session older than `expiry`. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, created_at| created_at.elapsed() < self.expiry);
        before.saturating_sub(self.sessions.len())
    }

    /// Sweep expired sessions every `interval` until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired();
                if removed > 0 {
                    info!(
                        "Swept {} expired session(s), {} remaining",
                        removed,
                        store.len()
                    );
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionLiveness for SessionStore {
    fn is_alive(&self, session_id: &SessionId) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|created_at| created_at.elapsed() < self.expiry)
    }
}

impl SessionAuthorization for SessionStore {
    fn is_session_allowed(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sessions_are_alive_and_allowed() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session_id = store.create();

        assert!(store.is_alive(&session_id));
        assert!(store.is_session_allowed(&session_id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_sessions_are_neither() {
        let store = SessionStore::new(Duration::from_secs(60));
        let stranger = SessionId::from("stranger");

        assert!(!store.is_alive(&stranger));
        assert!(!store.is_session_allowed(&stranger));
    }

    #[test]
    fn ended_sessions_are_forgotten() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session_id = store.create();

        assert!(store.end(&session_id));
        assert!(!store.end(&session_id));
        assert!(!store.is_alive(&session_id));
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_die_after_expiry_but_stay_known() {
        let store = SessionStore::new(Duration::from_secs(60));
        let session_id = store.create();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!store.is_alive(&session_id));
        assert!(store.is_session_allowed(&session_id));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_forgets_expired_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        for _ in 0..1000 {
            store.create();
        }

        tokio::time::advance(Duration::from_secs(30)).await;
        let fresh = store.create();
        tokio::time::advance(Duration::from_secs(3570)).await;

        assert_eq!(store.sweep_expired(), 1001);
        assert!(store.is_empty());
        assert!(!store.is_session_allowed(&fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_keeps_live_sessions() {
        let store = SessionStore::new(Duration::from_secs(60));
        let old = store.create();
        tokio::time::advance(Duration::from_secs(45)).await;
        let young = store.create();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(store.sweep_expired(), 1);
        assert!(!store.is_session_allowed(&old));
        assert!(store.is_alive(&young));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_task_bounds_the_store() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(60)));
        for _ in 0..100 {
            store.create();
        }

        let sweeper = store.spawn_sweeper(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(75)).await;

        assert_eq!(store.len(), 0);
        sweeper.abort();
    }
}
