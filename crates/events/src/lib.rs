//! Write-behind event emission
//!
//! Node and branch mutations enqueue an [`Event`] rather than notifying
//! subscribers inline: a bounded channel decouples the write path from
//! whatever is slow downstream (a webhook, a message bus publish). A
//! background task drains the channel in FIFO order per entity. If the
//! queue is full, the oldest queued event for that entity is dropped to
//! make room and a counter is incremented — callers can watch
//! [`EventEmitter::dropped_count`] to notice a backed-up consumer instead of
//! silently losing visibility into it.

#![warn(missing_docs)]

pub mod emitter;
pub mod event;

pub use emitter::EventEmitter;
pub use event::{Event, EventKind};
