use events::{Event, EventTemplate};
use log::*;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

#[derive(Debug, Default)]
struct Backlog {
    pending: VecDeque<Event>,
    /// Sequence number handed to the most recent push; 0 before the first.
    last_sequence_number: u64,
}

/// Ordered backlog of events for one session.
///
/// `push` and `pull` never block. Waiting for an event is composed on top via
/// [`SessionQueue::wait_for_event`], which parks on a per-queue [`Notify`].
/// `Notify::notify_one` stores a permit when nobody is parked yet, so a push
/// that lands between an empty `pull` and the start of the wait is still seen.
#[derive(Debug)]
pub struct SessionQueue {
    backlog: Mutex<Backlog>,
    available: Notify,
    max_backlog: Option<NonZeroUsize>,
}

impl SessionQueue {
    pub fn new() -> Self {
        Self::with_max_backlog(None)
    }

    /// A queue that drops its oldest pending event once `max_backlog` are waiting.
    pub fn with_max_backlog(max_backlog: Option<NonZeroUsize>) -> Self {
        Self {
            backlog: Mutex::new(Backlog::default()),
            available: Notify::new(),
            max_backlog,
        }
    }

    /// Stamp the next sequence number onto `template`, append it and wake one waiter.
    pub fn push(&self, template: EventTemplate) -> Event {
        let event = {
            let mut backlog = self.lock();
            backlog.last_sequence_number += 1;
            let event = Event::from_template(backlog.last_sequence_number, template);

            if let Some(max) = self.max_backlog {
                while backlog.pending.len() >= max.get() {
                    if let Some(dropped) = backlog.pending.pop_front() {
                        warn!(
                            "Session queue backlog full ({} events), dropping event {}",
                            max,
                            dropped.sequence_number()
                        );
                    }
                }
            }

            backlog.pending.push_back(event.clone());
            event
        };

        self.available.notify_one();
        event
    }

    /// Remove and return the head event, or `None` right away if the queue is empty.
    pub fn pull(&self) -> Option<Event> {
        self.lock().pending.pop_front()
    }

    /// Park until an event can be pulled or `deadline` passes.
    ///
    /// Every wake is followed by a `pull`. A wake that finds nothing (a stale
    /// permit, or another listener got there first) parks again until the
    /// deadline; the deadline itself is followed by one last `pull`.
    pub async fn wait_for_event(&self, deadline: Instant) -> Option<Event> {
        loop {
            if timeout_at(deadline, self.available.notified()).await.is_err() {
                return self.pull();
            }
            if let Some(event) = self.pull() {
                return Some(event);
            }
            trace!("Woke on an empty session queue, waiting again");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::time::Duration;

    fn template(n: u64) -> EventTemplate {
        EventTemplate::new(json!({ "n": n }))
    }

    #[test]
    fn pull_returns_events_in_push_order_numbered_from_one() {
        let queue = SessionQueue::new();
        for n in 0..5 {
            queue.push(template(n));
        }

        let drained: Vec<Event> = std::iter::from_fn(|| queue.pull()).collect();
        let sequence: Vec<u64> = drained.iter().map(Event::sequence_number).collect();
        let payloads: Vec<_> = drained.iter().map(|e| e.payload()["n"].clone()).collect();

        assert_eq!(sequence, vec![1, 2, 3, 4, 5]);
        assert_eq!(payloads, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
    }

    #[test]
    fn push_returns_the_stamped_event() {
        let queue = SessionQueue::new();
        let first = queue.push(template(10).with_producer("pid-1"));
        let second = queue.push(template(11));

        assert_eq!(first.sequence_number(), 1);
        assert_eq!(first.producer_id(), Some("pid-1"));
        assert_eq!(second.sequence_number(), 2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pull_on_empty_queue_is_none_every_time() {
        let queue = SessionQueue::new();
        assert!(queue.pull().is_none());

        queue.push(template(1));
        assert!(queue.pull().is_some());
        for _ in 0..3 {
            assert!(queue.pull().is_none());
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn sequence_keeps_counting_after_drain() {
        let queue = SessionQueue::new();
        queue.push(template(1));
        queue.pull();

        assert_eq!(queue.push(template(2)).sequence_number(), 2);
    }

    #[test]
    fn full_backlog_drops_oldest() {
        let queue = SessionQueue::with_max_backlog(NonZeroUsize::new(2));
        for n in 0..4 {
            queue.push(template(n));
        }

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pull().map(|e| e.sequence_number()), Some(3));
        assert_eq!(queue.pull().map(|e| e.sequence_number()), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_with_nothing_pushed() {
        let queue = SessionQueue::new();
        let start = Instant::now();

        let event = queue
            .wait_for_event(start + Duration::from_secs(30))
            .await;

        assert!(event.is_none());
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn push_before_wait_starts_is_not_missed() {
        let queue = SessionQueue::new();
        assert!(queue.pull().is_none());
        queue.push(template(1));

        let start = Instant::now();
        let event = queue
            .wait_for_event(start + Duration::from_secs(30))
            .await;

        assert_eq!(event.map(|e| e.sequence_number()), Some(1));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_wakeup_keeps_waiting_until_deadline() {
        let queue = SessionQueue::new();
        // Leaves a stored permit behind once the event is taken directly.
        queue.push(template(1));
        assert!(queue.pull().is_some());

        let start = Instant::now();
        let event = queue
            .wait_for_event(start + Duration::from_secs(30))
            .await;

        assert!(event.is_none());
        assert!(start.elapsed() >= Duration::from_secs(30));
        assert!(start.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn push_wakes_a_parked_waiter() {
        let queue = Arc::new(SessionQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                let event = queue
                    .wait_for_event(start + Duration::from_secs(30))
                    .await;
                (event, start.elapsed())
            })
        };

        tokio::time::sleep(Duration::from_secs(2)).await;
        queue.push(template(1));

        let (event, elapsed) = waiter.await.unwrap();
        assert_eq!(event.map(|e| e.sequence_number()), Some(1));
        assert!(elapsed < Duration::from_secs(3));
    }
}
