//! Response assembly for a single listen call.

use crate::error::{out_of_sync, Error};
use crate::queue::SessionQueue;
use events::Event;

/// Events drained by one listen call, in sequence order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    pub events: Vec<Event>,
    /// Sequence number of the last event in `events`; the caller's next checkpoint.
    pub last_event_id: u64,
}

/// Result of a listen call that was allowed to run to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenResponse {
    Batch(EventBatch),
    /// Nothing arrived before the wait timed out.
    Heartbeat,
}

impl ListenResponse {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, ListenResponse::Heartbeat)
    }

    pub fn into_batch(self) -> Option<EventBatch> {
        match self {
            ListenResponse::Batch(batch) => Some(batch),
            ListenResponse::Heartbeat => None,
        }
    }
}

/// Converts a raw `lastEventID` as clients send it into a checkpoint.
/// Missing or negative values mean "no gap check".
pub fn checkpoint_from_raw(raw: Option<i64>) -> Option<u64> {
    raw.and_then(|id| u64::try_from(id).ok())
}

/// Collect `first` and everything behind it in `queue` into a response.
///
/// Only `first` is compared against the checkpoint. When it does not follow
/// the checkpoint the call fails right there and the rest stays queued.
pub(crate) fn drain(
    queue: &SessionQueue,
    first: Option<Event>,
    checkpoint: Option<u64>,
) -> Result<ListenResponse, Error> {
    let Some(first) = first else {
        return Ok(ListenResponse::Heartbeat);
    };

    if let Some(checkpoint) = checkpoint {
        let expected = checkpoint.saturating_add(1);
        if first.sequence_number() != expected {
            return Err(out_of_sync(expected, first.sequence_number()));
        }
    }

    let mut events = vec![first];
    events.extend(std::iter::from_fn(|| queue.pull()));

    let last_event_id = events
        .last()
        .map(Event::sequence_number)
        .unwrap_or_default();

    Ok(ListenResponse::Batch(EventBatch {
        events,
        last_event_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use events::EventTemplate;
    use serde_json::json;

    fn queue_with(count: usize) -> SessionQueue {
        let queue = SessionQueue::new();
        for n in 0..count {
            queue.push(EventTemplate::new(json!(n)));
        }
        queue
    }

    fn drain_all(queue: &SessionQueue, checkpoint: Option<u64>) -> Result<ListenResponse, Error> {
        let first = queue.pull();
        drain(queue, first, checkpoint)
    }

    #[test]
    fn raw_checkpoint_conversion() {
        assert_eq!(checkpoint_from_raw(None), None);
        assert_eq!(checkpoint_from_raw(Some(-1)), None);
        assert_eq!(checkpoint_from_raw(Some(-42)), None);
        assert_eq!(checkpoint_from_raw(Some(0)), Some(0));
        assert_eq!(checkpoint_from_raw(Some(17)), Some(17));
    }

    #[test]
    fn nothing_to_drain_is_a_heartbeat() {
        let queue = SessionQueue::new();
        assert_eq!(drain_all(&queue, Some(3)).unwrap(), ListenResponse::Heartbeat);
    }

    #[test]
    fn matching_checkpoint_drains_everything() {
        let queue = queue_with(3);
        let batch = drain_all(&queue, Some(0)).unwrap().into_batch().unwrap();

        let sequence: Vec<u64> = batch.events.iter().map(Event::sequence_number).collect();
        assert_eq!(sequence, vec![1, 2, 3]);
        assert_eq!(batch.last_event_id, 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn no_checkpoint_never_goes_out_of_sync() {
        let queue = queue_with(5);
        for _ in 0..4 {
            queue.pull();
        }

        let batch = drain_all(&queue, None).unwrap().into_batch().unwrap();
        assert_eq!(batch.last_event_id, 5);
    }

    #[test]
    fn gap_after_checkpoint_is_out_of_sync() {
        let queue = queue_with(7);
        for _ in 0..4 {
            queue.pull();
        }

        let err = drain_all(&queue, Some(3)).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OutOfSync {
                expected: 4,
                received: 5
            }
        );
        // Only the offending event was consumed.
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn checkpoint_ahead_of_queue_is_out_of_sync() {
        let queue = queue_with(2);
        let err = drain_all(&queue, Some(9)).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OutOfSync {
                expected: 10,
                received: 1
            }
        );
    }
}
