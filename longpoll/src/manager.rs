use crate::clock::{Clock, TokioClock};
use crate::error::{cancelled, unauthorized, Error, UnauthorizedReason};
use crate::listen::{self, ListenResponse};
use crate::registry::QueueRegistry;
use crate::session::{SessionAuthorization, SessionLiveness};
use events::{EventTemplate, SessionId};
use log::*;
use std::future::{self, Future};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

/// How long a session's queue survives without a listen or publish touching it.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// How long a listen call waits for an event before answering with a heartbeat.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub idle_timeout: Duration,
    pub wait_timeout: Duration,
    /// Per-queue cap; the oldest pending event is dropped past it. `None` is unbounded.
    pub max_backlog: Option<NonZeroUsize>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            max_backlog: None,
        }
    }
}

/// Entry point for listening and publishing.
pub struct Manager {
    registry: QueueRegistry,
    liveness: Arc<dyn SessionLiveness>,
    authorization: Arc<dyn SessionAuthorization>,
    wait_timeout: Duration,
}

impl Manager {
    pub fn new(
        config: ManagerConfig,
        liveness: Arc<dyn SessionLiveness>,
        authorization: Arc<dyn SessionAuthorization>,
    ) -> Self {
        Self::with_clock(config, liveness, authorization, Arc::new(TokioClock))
    }

    /// Like [`Manager::new`], with the clock the registry uses for idle expiry.
    pub fn with_clock(
        config: ManagerConfig,
        liveness: Arc<dyn SessionLiveness>,
        authorization: Arc<dyn SessionAuthorization>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry: QueueRegistry::with_clock(config.idle_timeout, config.max_backlog, clock),
            liveness,
            authorization,
            wait_timeout: config.wait_timeout,
        }
    }

    /// Wait for this session's next events.
    ///
    /// Returns as soon as at least one event is queued, draining everything
    /// that is, or a heartbeat once `wait_timeout` passes with nothing arriving.
    /// With a `checkpoint`, the first drained event must be `checkpoint + 1`.
    pub async fn listen(
        &self,
        session_id: Option<&SessionId>,
        checkpoint: Option<u64>,
    ) -> Result<ListenResponse, Error> {
        self.listen_until(session_id, checkpoint, future::pending())
            .await
    }

    /// [`Manager::listen`], abandoned with `ErrorKind::Cancelled` if `cancel`
    /// completes while the call is still waiting.
    pub async fn listen_until<F>(
        &self,
        session_id: Option<&SessionId>,
        checkpoint: Option<u64>,
        cancel: F,
    ) -> Result<ListenResponse, Error>
    where
        F: Future<Output = ()>,
    {
        let session_id = self.authorize(session_id)?;
        let lease = self.registry.lease(session_id);
        let queue = lease.queue();

        let first = match queue.pull() {
            Some(event) => Some(event),
            None => {
                debug!("No events queued for session {}, waiting", session_id);
                let deadline = Instant::now() + self.wait_timeout;
                tokio::select! {
                    event = queue.wait_for_event(deadline) => event,
                    _ = cancel => {
                        debug!("Listen for session {} cancelled", session_id);
                        return Err(cancelled());
                    }
                }
            }
        };

        let response = listen::drain(queue, first, checkpoint)?;
        match &response {
            ListenResponse::Batch(batch) => debug!(
                "Delivering {} event(s) to session {}, last event {}",
                batch.events.len(),
                session_id,
                batch.last_event_id
            ),
            ListenResponse::Heartbeat => trace!("Heartbeat for session {}", session_id),
        }
        Ok(response)
    }

    /// Append a copy of `template` to each receiver's queue and wake a listener.
    ///
    /// Receivers that are no longer alive lose their queue and get nothing.
    /// Never waits for delivery.
    pub fn publish_event(&self, template: EventTemplate, receivers: &[SessionId]) {
        for receiver in receivers {
            if !self.liveness.is_alive(receiver) {
                if self.registry.remove(receiver) {
                    info!("Session {} no longer alive, dropped its event queue", receiver);
                }
                continue;
            }

            let event = self
                .registry
                .get_or_create(receiver)
                .push(template.clone());
            trace!(
                "Queued event {} for session {}",
                event.sequence_number(),
                receiver
            );
        }
    }

    /// Forget a session's queue, e.g. on logout.
    pub fn remove_session(&self, session_id: &SessionId) -> bool {
        self.registry.remove(session_id)
    }

    pub fn has_queue(&self, session_id: &SessionId) -> bool {
        self.registry.contains(session_id)
    }

    pub fn queue_count(&self) -> usize {
        self.registry.len()
    }

    pub fn sweep_expired(&self) -> usize {
        self.registry.sweep_expired()
    }

    /// Sweep idle queues every `interval` until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = manager.sweep_expired();
                if removed > 0 {
                    info!(
                        "Swept {} idle event queue(s), {} remaining",
                        removed,
                        manager.queue_count()
                    );
                }
            }
        })
    }

    fn authorize<'a>(&self, session_id: Option<&'a SessionId>) -> Result<&'a SessionId, Error> {
        let Some(session_id) = session_id else {
            return Err(unauthorized(UnauthorizedReason::MissingSession));
        };

        if !self.authorization.is_session_allowed(session_id) {
            self.registry.remove(session_id);
            warn!("Session {} is not allowed to listen", session_id);
            return Err(unauthorized(UnauthorizedReason::NotAllowed));
        }

        if !self.liveness.is_alive(session_id) {
            self.registry.remove(session_id);
            info!("Session {} no longer alive, dropped its event queue", session_id);
            return Err(unauthorized(UnauthorizedReason::NotAlive));
        }

        Ok(session_id)
    }
}
