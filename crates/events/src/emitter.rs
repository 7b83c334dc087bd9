//! The bounded write-behind queue and its background drain task

use crate::event::Event;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

struct Inner {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    notify: Notify,
    dropped: AtomicU64,
}

/// A bounded, FIFO event queue with a write-behind background consumer.
///
/// A single global FIFO is used rather than one queue per entity: this
/// trivially preserves per-entity ordering (a total order implies every
/// sub-sequence is ordered) while keeping the drop-oldest overflow policy
/// simple to reason about.
#[derive(Clone)]
pub struct EventEmitter {
    inner: Arc<Inner>,
}

impl EventEmitter {
    /// Create an emitter with room for `capacity` queued-but-undelivered events.
    pub fn new(capacity: usize) -> Self {
        EventEmitter {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
                capacity,
                notify: Notify::new(),
                dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Enqueue `event`. If the queue is already at capacity, the oldest
    /// queued event is dropped to make room and [`Self::dropped_count`]
    /// is incremented.
    pub fn emit(&self, event: Event) {
        let mut queue = self.inner.queue.lock();
        if queue.len() >= self.inner.capacity {
            queue.pop_front();
            self.inner.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(capacity = self.inner.capacity, "event queue full, dropping oldest event");
        }
        queue.push_back(event);
        drop(queue);
        self.inner.notify.notify_one();
    }

    /// How many events have been dropped due to overflow since creation.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Number of events currently queued, awaiting delivery.
    pub fn queued_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Pop the oldest queued event, if any, without waiting.
    pub fn try_pop(&self) -> Option<Event> {
        self.inner.queue.lock().pop_front()
    }

    /// Spawn a background task that drains events FIFO and hands each to
    /// `sink`. The task runs until the returned handle is dropped/aborted;
    /// it never exits on its own.
    pub fn spawn_flush_task<F, Fut>(&self, mut sink: F) -> JoinHandle<()>
    where
        F: FnMut(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            loop {
                let next = inner.queue.lock().pop_front();
                match next {
                    Some(event) => sink(event).await,
                    None => inner.notify.notified().await,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use branchgraph_core::{EntityId, Timestamp};
    use std::sync::Mutex as StdMutex;

    fn sample_event() -> Event {
        Event::new(EventKind::NodeCreated, EntityId::new(), EntityId::new(), Timestamp::now())
    }

    #[test]
    fn emits_in_fifo_order() {
        let emitter = EventEmitter::new(4);
        let a = sample_event();
        let b = sample_event();
        emitter.emit(a.clone());
        emitter.emit(b.clone());
        assert_eq!(emitter.try_pop().unwrap().entity, a.entity);
        assert_eq!(emitter.try_pop().unwrap().entity, b.entity);
    }

    #[test]
    fn drops_oldest_on_overflow() {
        let emitter = EventEmitter::new(2);
        let a = sample_event();
        let b = sample_event();
        let c = sample_event();
        emitter.emit(a.clone());
        emitter.emit(b);
        emitter.emit(c.clone());
        assert_eq!(emitter.dropped_count(), 1);
        assert_eq!(emitter.queued_len(), 2);
        let first = emitter.try_pop().unwrap();
        assert_ne!(first.entity, a.entity);
    }

    #[tokio::test]
    async fn background_task_drains_events() {
        let emitter = EventEmitter::new(8);
        let received = Arc::new(StdMutex::new(Vec::new()));
        let received2 = received.clone();
        let handle = emitter.spawn_flush_task(move |event| {
            let received = received2.clone();
            async move {
                received.lock().unwrap().push(event.entity);
            }
        });

        let e1 = sample_event();
        let e2 = sample_event();
        emitter.emit(e1.clone());
        emitter.emit(e2.clone());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        handle.abort();

        let got = received.lock().unwrap().clone();
        assert_eq!(got, vec![e1.entity, e2.entity]);
    }
}
