//! The process-wide (per-run) event dispatch primitive, §4.1.
//!
//! Every subscriber gets its own buffered, serially-drained delivery
//! queue: `emit` never blocks on handler execution, so a handler that
//! synchronously triggers another `emit` cannot deadlock against itself
//! (§4.1, "emit MUST NOT deadlock"), and a slow handler cannot stall
//! delivery to unrelated subscribers (§4.1 concurrency model). Within one
//! subscriber, its queue drains in emit order, giving the required FIFO
//! guarantee; across subscribers, delivery is concurrent and unordered.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::event::{Event, EventKind};

/// A boxed async handler invoked once per matching event.
pub type Handler = Arc<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Errors the bus can surface to callers.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("timed out waiting for a matching event")]
    Timeout,
}

enum Filter {
    One(EventKind),
    All,
}

impl Filter {
    fn matches(&self, kind: EventKind) -> bool {
        match self {
            Filter::One(k) => *k == kind,
            Filter::All => true,
        }
    }
}

struct Subscriber {
    filter: Filter,
    sender: mpsc::UnboundedSender<Event>,
}

/// A single subscription id, used to unsubscribe. Dropping a [`StreamGuard`]
/// unsubscribes automatically; handler-style subscriptions return a
/// `SubscriptionId` the caller may unsubscribe explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Typed pub/sub bus carrying every lifecycle/tool/model/human/checkpoint
/// event for one run (§4.1). Cheaply cloneable; clones share the same
/// subscriber registry.
#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<DashMap<u64, Subscriber>>,
    next_id: Arc<AtomicU64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn register(&self, filter: Filter, handler: Handler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        self.subscribers.insert(id, Subscriber { filter, sender: tx });

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event).await;
            }
        });

        SubscriptionId(id)
    }

    /// Register a handler for exactly one event kind.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |e| Box::pin(handler(e)));
        self.register(Filter::One(kind), handler)
    }

    /// Register a handler for every event.
    pub fn subscribe_all<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |e| Box::pin(handler(e)));
        self.register(Filter::All, handler)
    }

    /// Unsubscribe; idempotent (a second call on the same id is a no-op).
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.remove(&id.0);
    }

    /// Deliver `event` to every matching subscriber.
    ///
    /// Dispatch into each subscriber's queue is synchronous and
    /// non-blocking; the handler itself runs on that subscriber's
    /// dedicated task, so `emit` returns as soon as the event has been
    /// queued everywhere it matches (see module docs for why this can't
    /// simply await every handler here).
    pub fn emit(&self, event: Event) {
        let kind = event.kind();
        for entry in self.subscribers.iter() {
            if entry.value().filter.matches(kind) {
                // An unbounded send only fails if the receiver task has
                // already exited (e.g. the subscription was dropped mid
                // flight); that's not a bus-level failure.
                let _ = entry.value().sender.send(event.clone());
            }
        }
    }

    /// Scoped acquisition of a channel yielding matching events until the
    /// returned [`StreamGuard`] is dropped, at which point unsubscription
    /// is guaranteed on every exit path (panic, early return, normal drop).
    pub fn stream(&self, kinds: Vec<EventKind>) -> StreamGuard {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let filter = if kinds.len() == 1 {
            Filter::One(kinds[0])
        } else {
            // Multi-kind streams reuse the all-filter and let the guard's
            // receiver side discard non-matching kinds; see `StreamGuard`.
            Filter::All
        };
        self.subscribers.insert(id, Subscriber { filter, sender: tx });
        StreamGuard {
            bus: self.clone(),
            id: SubscriptionId(id),
            kinds,
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    /// Suspend until an event of `kind` satisfying `predicate` arrives, or
    /// `timeout` elapses.
    pub async fn wait_for<P>(
        &self,
        kind: EventKind,
        predicate: P,
        timeout: Duration,
    ) -> Result<Event, BusError>
    where
        P: Fn(&Event) -> bool + Send + 'static,
    {
        let mut guard = self.stream(vec![kind]);
        let fut = async {
            loop {
                match guard.next().await {
                    Some(event) if predicate(&event) => return Some(event),
                    Some(_) => continue,
                    None => return None,
                }
            }
        };
        match tokio::time::timeout(timeout, fut).await {
            Ok(Some(event)) => Ok(event),
            _ => Err(BusError::Timeout),
        }
    }
}

/// A scoped subscription returned by [`EventBus::stream`]; yields matching
/// events via [`StreamGuard::next`] and unsubscribes on drop.
pub struct StreamGuard {
    bus: EventBus,
    id: SubscriptionId,
    kinds: Vec<EventKind>,
    inner: UnboundedReceiverStream<Event>,
}

impl StreamGuard {
    /// Await the next matching event, or `None` once the bus drops this
    /// subscription's sender (never happens while the guard is alive).
    pub async fn next(&mut self) -> Option<Event> {
        use futures::StreamExt;
        loop {
            let event = self.inner.next().await?;
            if self.kinds.len() <= 1 || self.kinds.contains(&event.kind()) {
                return Some(event);
            }
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
