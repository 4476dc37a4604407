use crate::clock::{Clock, TokioClock};
use crate::queue::SessionQueue;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use events::SessionId;
use log::*;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

#[derive(Debug)]
struct RegistryEntry {
    queue: Arc<SessionQueue>,
    last_access: Instant,
    /// Outstanding [`QueueLease`]s. An entry with a listener never expires.
    listeners: usize,
}

/// Maps each session to its event queue.
///
/// An entry stays valid for `idle_timeout` after it was last touched by
/// [`QueueRegistry::get_or_create`] or a [`QueueLease`] was released, and for
/// as long as any lease on it is held. Past that it is treated as absent: the
/// next lookup replaces it with a fresh, empty queue, and
/// [`QueueRegistry::sweep_expired`] drops it. Check-then-create runs under the
/// map's per-key entry lock, so two callers racing on a new session get the
/// same queue, while unrelated sessions do not contend on one global lock.
pub struct QueueRegistry {
    entries: DashMap<SessionId, RegistryEntry>,
    idle_timeout: Duration,
    max_backlog: Option<NonZeroUsize>,
    clock: Arc<dyn Clock>,
}

impl QueueRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self::with_clock(idle_timeout, None, Arc::new(TokioClock))
    }

    pub fn with_clock(
        idle_timeout: Duration,
        max_backlog: Option<NonZeroUsize>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            idle_timeout,
            max_backlog,
            clock,
        }
    }

    /// Return the session's live queue, creating one if there is none or the
    /// previous one sat idle too long. Refreshes the entry's idle deadline.
    pub fn get_or_create(&self, session_id: &SessionId) -> Arc<SessionQueue> {
        self.access(session_id, false)
    }

    /// Like [`QueueRegistry::get_or_create`], but the entry cannot expire
    /// until the returned lease is dropped. Dropping it refreshes the idle
    /// deadline. Listeners hold one for the whole wait.
    pub fn lease(&self, session_id: &SessionId) -> QueueLease<'_> {
        let queue = self.access(session_id, true);
        QueueLease {
            registry: self,
            session_id: session_id.clone(),
            queue,
        }
    }

    fn access(&self, session_id: &SessionId, listening: bool) -> Arc<SessionQueue> {
        let now = self.clock.now();
        let added = usize::from(listening);

        match self.entries.entry(session_id.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if self.is_expired(entry, now) {
                    debug!(
                        "Event queue for session {} idle beyond {:?}, starting a new one",
                        session_id, self.idle_timeout
                    );
                    *entry = self.new_entry(now);
                } else {
                    entry.last_access = now;
                }
                entry.listeners += added;
                entry.queue.clone()
            }
            Entry::Vacant(vacant) => {
                debug!("Creating event queue for session {}", session_id);
                let mut entry = vacant.insert(self.new_entry(now));
                entry.listeners += added;
                entry.queue.clone()
            }
        }
    }

    /// Drop the session's entry. Returns whether one was present.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        self.entries.remove(session_id).is_some()
    }

    /// Whether a lookup right now would hit an existing queue. Does not refresh.
    pub fn contains(&self, session_id: &SessionId) -> bool {
        let now = self.clock.now();
        self.entries
            .get(session_id)
            .is_some_and(|entry| !self.is_expired(&entry, now))
    }

    /// Remove every entry that has been idle for at least `idle_timeout`.
    /// Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !self.is_expired(entry, now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of entries currently stored, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn new_entry(&self, now: Instant) -> RegistryEntry {
        RegistryEntry {
            queue: Arc::new(SessionQueue::with_max_backlog(self.max_backlog)),
            last_access: now,
            listeners: 0,
        }
    }

    fn release(&self, session_id: &SessionId, queue: &Arc<SessionQueue>) {
        if let Some(mut entry) = self.entries.get_mut(session_id) {
            // The entry may have been removed or replaced while leased.
            if Arc::ptr_eq(&entry.queue, queue) {
                entry.listeners = entry.listeners.saturating_sub(1);
                entry.last_access = self.clock.now();
            }
        }
    }

    fn is_expired(&self, entry: &RegistryEntry, now: Instant) -> bool {
        entry.listeners == 0
            && now.saturating_duration_since(entry.last_access) >= self.idle_timeout
    }
}

/// A session's queue, held open against idle expiry until dropped.
pub struct QueueLease<'a> {
    registry: &'a QueueRegistry,
    session_id: SessionId,
    queue: Arc<SessionQueue>,
}

impl QueueLease<'_> {
    pub fn queue(&self) -> &Arc<SessionQueue> {
        &self.queue
    }
}

impl Drop for QueueLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.session_id, &self.queue);
    }
}
