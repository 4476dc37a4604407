use crate::Manager;
use async_trait::async_trait;
use events::{EventHandler, Publication};
use log::*;
use std::sync::Arc;

/// Delivers publications into the receivers' long-poll queues.
///
/// The application decides who receives an event and puts their session ids
/// on the publication. This handler only routes.
pub struct LongPollEventHandler {
    manager: Arc<Manager>,
}

impl LongPollEventHandler {
    pub fn new(manager: Arc<Manager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl EventHandler for LongPollEventHandler {
    async fn handle(&self, publication: &Publication) {
        self.manager
            .publish_event(publication.template.clone(), &publication.receivers);

        debug!(
            "Published event to {} session(s): {:?}",
            publication.receivers.len(),
            publication.receivers
        );
    }
}
