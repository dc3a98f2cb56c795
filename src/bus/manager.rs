//! Event bus broadcasting mutation events to subscribers.

use crate::types::Message;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use tracing::{debug, warn};

use super::types::{BusConfig, DropReason, SubscriptionId, Topic};

/// Sending half held by the bus for one subscriber.
enum SubscriberSender {
    Unbounded(mpsc::UnboundedSender<Message>),
    Bounded(mpsc::Sender<Message>),
}

/// Receiving half held by a [`Subscription`].
enum SubscriberReceiver {
    Unbounded(mpsc::UnboundedReceiver<Message>),
    Bounded(mpsc::Receiver<Message>),
}

/// Internal subscriber state.
struct Subscriber {
    sender: SubscriberSender,
}

impl Subscriber {
    /// Enqueue a payload without waiting.
    fn try_send(&self, payload: Message) -> Result<(), DropReason> {
        match &self.sender {
            SubscriberSender::Unbounded(tx) => {
                tx.send(payload).map_err(|_| DropReason::Disconnected)
            }
            SubscriberSender::Bounded(tx) => match tx.try_send(payload) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(DropReason::BufferOverflow),
                Err(TrySendError::Closed(_)) => Err(DropReason::Disconnected),
            },
        }
    }
}

#[derive(Default)]
struct Registry {
    topics: HashMap<Topic, HashMap<SubscriptionId, Subscriber>>,
    closed: bool,
}

/// In-process publish/subscribe broker over the mutation topics.
///
/// Every subscriber of a topic receives every payload published on it after
/// registration, in publish order. Publishing never waits on subscribers.
pub struct EventBus {
    /// Active subscribers by topic. Publishing holds this lock for the whole
    /// fan-out so all subscribers of a topic observe one publish order.
    registry: Mutex<Registry>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    config: BusConfig,
}

impl EventBus {
    /// Create a new bus.
    pub fn new(config: BusConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Register a new subscriber on `topic`.
    ///
    /// The returned stream yields only payloads published after this call.
    /// Dropping it unregisters the subscriber. On a closed bus the stream is
    /// already finished.
    pub fn subscribe(self: &Arc<Self>, topic: Topic) -> Subscription {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = match self.config.buffer_size {
            Some(size) => {
                let (tx, rx) = mpsc::channel(size.max(1));
                (SubscriberSender::Bounded(tx), SubscriberReceiver::Bounded(rx))
            }
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                (SubscriberSender::Unbounded(tx), SubscriberReceiver::Unbounded(rx))
            }
        };

        let mut registry = self.registry.lock();
        if registry.closed {
            debug!(topic = %topic, subscription = %id, "subscribe on closed bus");
        } else {
            registry
                .topics
                .entry(topic)
                .or_default()
                .insert(id, Subscriber { sender });
            debug!(topic = %topic, subscription = %id, "subscriber registered");
        }

        Subscription {
            id,
            topic,
            receiver,
            bus: Arc::downgrade(self),
        }
    }

    /// Unregister a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) {
        self.remove(topic, id, DropReason::Unsubscribed);
    }

    fn remove(&self, topic: Topic, id: SubscriptionId, reason: DropReason) {
        let mut registry = self.registry.lock();
        let removed = registry
            .topics
            .get_mut(&topic)
            .and_then(|subs| subs.remove(&id))
            .is_some();
        if removed {
            debug!(topic = %topic, subscription = %id, ?reason, "subscriber removed");
        }
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    ///
    /// Returns the number of subscribers the payload was handed to. With no
    /// subscribers the payload is discarded. Subscribers whose queue is closed
    /// or full are dropped; the rest still receive it.
    pub fn publish(&self, topic: Topic, payload: &Message) -> usize {
        let mut registry = self.registry.lock();
        let Some(subs) = registry.topics.get_mut(&topic) else {
            debug!(topic = %topic, message = %payload.id, recipients = 0, "published");
            return 0;
        };

        let mut delivered = 0;
        let mut to_remove = Vec::new();
        for (id, sub) in subs.iter() {
            match sub.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(reason) => to_remove.push((*id, reason)),
            }
        }

        // Remove dropped subscribers
        for (id, reason) in to_remove {
            subs.remove(&id);
            match reason {
                DropReason::BufferOverflow => {
                    warn!(topic = %topic, subscription = %id, "dropping slow subscriber")
                }
                _ => debug!(topic = %topic, subscription = %id, ?reason, "subscriber gone"),
            }
        }

        debug!(topic = %topic, message = %payload.id, recipients = delivered, "published");
        delivered
    }

    /// Unregister every subscriber and refuse new ones. All open streams end
    /// after draining what was already queued.
    pub fn close(&self) {
        let mut registry = self.registry.lock();
        let count: usize = registry.topics.values().map(HashMap::len).sum();
        registry.topics.clear();
        registry.closed = true;
        debug!(subscribers = count, reason = ?DropReason::BusClosed, "event bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.registry.lock().closed
    }

    /// Total number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().topics.values().map(HashMap::len).sum()
    }

    /// Number of active subscribers on one topic.
    pub fn topic_subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .lock()
            .topics
            .get(&topic)
            .map_or(0, HashMap::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

/// A live registration on one topic, consumed as a [`Stream`] of payloads.
///
/// The stream ends when the bus drops this subscriber or is closed.
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    receiver: SubscriberReceiver,
    bus: Weak<EventBus>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Wait for the next payload. `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Message> {
        match &mut self.receiver {
            SubscriberReceiver::Unbounded(rx) => rx.recv().await,
            SubscriberReceiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Take a payload if one is queued (non-blocking).
    pub fn try_recv(&mut self) -> Result<Message, TryRecvError> {
        match &mut self.receiver {
            SubscriberReceiver::Unbounded(rx) => rx.try_recv(),
            SubscriberReceiver::Bounded(rx) => rx.try_recv(),
        }
    }

    /// Unregister now instead of on drop.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        match &mut self.get_mut().receiver {
            SubscriberReceiver::Unbounded(rx) => rx.poll_recv(cx),
            SubscriberReceiver::Bounded(rx) => rx.poll_recv(cx),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.topic, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}
