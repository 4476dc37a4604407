use config::Config;
use events::EventPublisher;
use log::info;
use longpoll::{LongPollEventHandler, Manager};
use sessions::SessionStore;
use std::sync::Arc;

pub mod config;
pub mod logging;
pub mod sessions;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub longpoll_manager: Arc<Manager>,
    pub event_publisher: EventPublisher,
}

impl AppState {
    /// Wire the session store, the long-poll engine and the publisher together.
    pub fn new(app_config: Config) -> Self {
        let sessions = Arc::new(SessionStore::new(app_config.session_expiry()));
        let manager_config = app_config.manager_config();

        info!(
            "Long-poll config: idle_timeout={:?}, wait_timeout={:?}, max_backlog={:?}",
            manager_config.idle_timeout, manager_config.wait_timeout, manager_config.max_backlog,
        );

        let longpoll_manager = Arc::new(Manager::new(
            manager_config,
            sessions.clone(),
            sessions.clone(),
        ));
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(LongPollEventHandler::new(longpoll_manager.clone())));

        Self {
            config: app_config,
            sessions,
            longpoll_manager,
            event_publisher,
        }
    }

    pub fn manager(&self) -> &Manager {
        self.longpoll_manager.as_ref()
    }
}
