//! Long-poll event distribution.
//!
//! This crate keeps a backlog of events per client session and hands them
//! out to HTTP long-poll requests, in order, with gap detection against the
//! client's checkpoint and a heartbeat when nothing arrives in time.
//!
//! # Architecture
//!
//! - **One queue per session**: `SessionQueue` is a FIFO with its own lock
//!   and wake signal. Sequence numbers are per queue and start at 1.
//! - **Time-bounded registry**: `QueueRegistry` maps session ids to queues.
//!   An entry untouched for the idle timeout (5 minutes by default) is treated
//!   as gone, whether or not the session object still exists.
//! - **No global lock**: registry lookups lock one map shard; waits lock nothing.
//! - **At-most-once handout**: a drained event is gone. There is no replay.
//!
//! # Listen Flow
//!
//! 1. The session is checked against the authorization and liveness hooks;
//!    a refused session also loses its queue.
//! 2. The queue is fetched or created.
//! 3. If it is empty, the call waits up to the wait timeout (30 seconds by
//!    default) for a publish to wake it.
//! 4. Everything queued is drained. When the client sent a checkpoint, the
//!    first event must be checkpoint + 1, otherwise the call is out of sync.
//! 5. The result is the batch plus its last sequence number, or a heartbeat.
//!
//! # Example: Publishing an event
//!
//! ```rust,ignore
//! use events::{EventTemplate, SessionId};
//!
//! manager.publish_event(
//!     EventTemplate::new(json!({ "download": "finished" })).with_producer("worker-3"),
//!     &[SessionId::from("5f1c...")],
//! );
//! ```
//!
//! # Modules
//!
//! - `queue`: SessionQueue, the per-session backlog
//! - `registry`: QueueRegistry with idle expiry
//! - `manager`: listen and publish on top of the registry
//! - `listen`: response types and batch assembly
//! - `session`: liveness and authorization hooks
//! - `clock`: injectable time source for expiry
//! - `event_handler`: bridge from `events::EventPublisher`

pub mod clock;
pub mod error;
pub mod event_handler;
pub mod listen;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod session;

pub use error::{Error, ErrorKind, UnauthorizedReason};
pub use event_handler::LongPollEventHandler;
pub use events::{Event, EventTemplate, SessionId};
pub use listen::{checkpoint_from_raw, EventBatch, ListenResponse};
pub use manager::{Manager, ManagerConfig, DEFAULT_IDLE_TIMEOUT, DEFAULT_WAIT_TIMEOUT};
pub use session::{SessionAuthorization, SessionLiveness};
