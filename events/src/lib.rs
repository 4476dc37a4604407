//! Event types shared by the long-poll engine and the application layer.
//!
//! This crate provides the event envelope and the publishing seam that let
//! application code hand events to the long-poll engine without depending on it.
//!
//! # Architecture
//!
//! - **EventTemplate**: what a producer hands in (optional producer id + payload)
//! - **Event**: the immutable envelope a queue hands out, stamped with the
//!   queue's sequence number at append time
//! - **Publication**: one template addressed to a set of receiver sessions
//! - **EventHandler**: Trait for implementing publication handlers
//! - **EventPublisher**: Publishes to registered handlers
//!
//! This crate has no dependencies on internal crates. Payloads are carried as
//! serialized JSON values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque identity of a client session, as issued by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The producer-supplied part of an event. A template carries no sequence
/// number: every receiver queue stamps its own copy when the event is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    /// Identifier of the originating process or actor, if any.
    pub producer_id: Option<String>,
    pub payload: Value,
}

impl EventTemplate {
    pub fn new(payload: Value) -> Self {
        Self {
            producer_id: None,
            payload,
        }
    }

    pub fn with_producer(mut self, producer_id: impl Into<String>) -> Self {
        self.producer_id = Some(producer_id.into());
        self
    }
}

/// An event as it sits in exactly one session queue.
///
/// Fields are private so an event cannot be altered once a queue has assigned
/// its sequence number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    sequence_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer_id: Option<String>,
    payload: Value,
}

impl Event {
    pub fn from_template(sequence_number: u64, template: EventTemplate) -> Self {
        Self {
            sequence_number,
            producer_id: template.producer_id,
            payload: template.payload,
        }
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn producer_id(&self) -> Option<&str> {
        self.producer_id.as_deref()
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// One event template addressed to a set of receiver sessions.
#[derive(Debug, Clone)]
pub struct Publication {
    pub template: EventTemplate,
    /// Sessions whose queues should receive their own copy of the event.
    pub receivers: Vec<SessionId>,
}

/// Trait for handling publications.
/// Implementations deliver events somewhere, e.g. into long-poll queues.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, publication: &Publication);
}

/// Publishes to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish to all registered handlers.
    pub async fn publish(&self, publication: Publication) {
        for handler in self.handlers.iter() {
            handler.handle(&publication).await;
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, publication: &Publication) {
            self.seen.lock().unwrap().push(format!(
                "{}:{}",
                self.name,
                publication.receivers.len()
            ));
        }
    }

    #[test]
    fn event_takes_fields_from_template() {
        let template = EventTemplate::new(json!({"k": 1})).with_producer("worker-7");
        let event = Event::from_template(4, template);

        assert_eq!(event.sequence_number(), 4);
        assert_eq!(event.producer_id(), Some("worker-7"));
        assert_eq!(event.payload(), &json!({"k": 1}));
    }

    #[test]
    fn absent_producer_is_omitted_when_serialized() {
        let event = Event::from_template(1, EventTemplate::new(json!("hello")));
        let value = serde_json::to_value(&event).unwrap();

        assert!(value.get("producer_id").is_none());
        assert_eq!(value["sequence_number"], json!(1));
    }

    #[test]
    fn session_id_display_is_the_raw_id() {
        let id = SessionId::from("abc-123");
        assert_eq!(id.to_string(), "abc-123");
        assert_eq!(id.as_str(), "abc-123");
    }

    #[tokio::test]
    async fn publisher_calls_handlers_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let publisher = EventPublisher::new()
            .with_handler(Arc::new(Recorder {
                name: "first",
                seen: seen.clone(),
            }))
            .with_handler(Arc::new(Recorder {
                name: "second",
                seen: seen.clone(),
            }));

        publisher
            .publish(Publication {
                template: EventTemplate::new(json!(null)),
                receivers: vec![SessionId::from("a"), SessionId::from("b")],
            })
            .await;

        assert_eq!(publisher.handler_count(), 2);
        assert_eq!(*seen.lock().unwrap(), vec!["first:2", "second:2"]);
    }
}
