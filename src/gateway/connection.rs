//! Per-client gateway connection.

use crate::bus::{EventBus, SubscriptionId, Topic};
use crate::error::BoardError;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{ClientFrame, ServerFrame};

/// What the transport should do after a client frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    /// The client asked to terminate the connection.
    Terminate,
}

/// One active subscription of a connection.
struct ActiveSubscription {
    topic: Topic,
    bus_id: SubscriptionId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActiveSubscription {
    /// Stop forwarding and unregister from the bus, without waiting for the
    /// forwarder to exit.
    fn abort(&self, bus: &EventBus) {
        self.cancel.cancel();
        bus.unsubscribe(self.topic, self.bus_id);
        self.task.abort();
    }

    /// Like [`abort`](Self::abort), then wait until the forwarder can no
    /// longer queue frames.
    async fn shutdown(self, bus: &EventBus) {
        self.abort(bus);
        let _ = self.task.await;
    }
}

type ActiveMap = Arc<Mutex<HashMap<String, ActiveSubscription>>>;

/// Remove `id` if it still belongs to bus subscription `bus_id`.
///
/// Whoever removes an entry owns its `complete` frame.
fn release(active: &ActiveMap, id: &str, bus_id: SubscriptionId) -> bool {
    let mut active = active.lock();
    match active.get(id) {
        Some(entry) if entry.bus_id == bus_id => {
            active.remove(id);
            true
        }
        _ => false,
    }
}

/// A client connection to the subscription gateway.
///
/// Owns one outbound frame queue toward the transport and one forwarding task
/// per active subscription. Each forwarder drains its bus subscription into
/// the outbound queue in arrival order. Subscriptions are independent:
/// stopping one, or one failing, leaves the rest running.
pub struct GatewayConnection {
    /// Connection ID (for logging).
    id: String,
    bus: Arc<EventBus>,
    outbound: mpsc::Sender<ServerFrame>,
    /// Active subscriptions by client-chosen id. Forwarders remove their own
    /// entry when the bus ends them.
    active: ActiveMap,
    /// Parent of every subscription token; cancelled when the connection
    /// closes.
    closed: CancellationToken,
}

impl GatewayConnection {
    /// Create a connection whose frames are written to `outbound`.
    pub fn new(id: impl Into<String>, bus: Arc<EventBus>, outbound: mpsc::Sender<ServerFrame>) -> Self {
        let id = id.into();
        info!(connection = %id, "gateway connection opened");
        Self {
            id,
            bus,
            outbound,
            active: Arc::new(Mutex::new(HashMap::new())),
            closed: CancellationToken::new(),
        }
    }

    /// Number of subscriptions still forwarding.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Apply one client frame.
    pub async fn handle_frame(&self, frame: ClientFrame) -> FrameOutcome {
        match frame {
            ClientFrame::ConnectionInit { .. } => {
                self.send(ServerFrame::ConnectionAck).await;
            }
            ClientFrame::Start { id, payload } => {
                if let Err(e) = self.start(id.clone(), payload.topic) {
                    self.send(ServerFrame::error(Some(id), e.to_string())).await;
                }
            }
            ClientFrame::Stop { id } => {
                if self.stop(&id).await {
                    self.send(ServerFrame::Complete { id }).await;
                }
            }
            ClientFrame::ConnectionTerminate => return FrameOutcome::Terminate,
        }
        FrameOutcome::Continue
    }

    /// Parse and apply one raw text frame. Unparseable input is answered with
    /// an error frame and does not close the connection.
    pub async fn handle_text(&self, text: &str) -> FrameOutcome {
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => self.handle_frame(frame).await,
            Err(e) => {
                warn!(connection = %self.id, error = %e, "invalid client frame");
                self.send(ServerFrame::error(None, format!("invalid frame: {e}")))
                    .await;
                FrameOutcome::Continue
            }
        }
    }

    /// Register `id` on `topic` and spawn its forwarder.
    ///
    /// Registration with the bus completes before this returns, so every
    /// publish after it reaches the client.
    fn start(&self, id: String, topic: Topic) -> Result<(), BoardError> {
        let mut active = self.active.lock();
        if active.contains_key(&id) {
            return Err(BoardError::Validation(format!(
                "subscription {id} is already active"
            )));
        }

        let mut subscription = self.bus.subscribe(topic);
        let bus_id = subscription.id();
        let cancel = self.closed.child_token();
        let token = cancel.clone();
        let outbound = self.outbound.clone();
        let registry = Arc::clone(&self.active);
        let connection = self.id.clone();
        let sub_id = id.clone();

        // The entry is inserted before this lock is released, so the
        // forwarder's `release` always finds it.
        let task = tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    next = subscription.next() => next,
                };
                let Some(message) = message else { break };

                let frame = ServerFrame::Data {
                    id: sub_id.clone(),
                    topic,
                    payload: message,
                };
                let sent = tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    sent = outbound.send(frame) => sent,
                };
                if sent.is_err() {
                    let err = BoardError::Transport("outbound channel closed".to_string());
                    warn!(connection = %connection, subscription = %sub_id, error = %err, "delivery failed");
                    drop(subscription);
                    release(&registry, &sub_id, bus_id);
                    return;
                }
            }

            // The bus ended this subscription (closed, or dropped as slow).
            drop(subscription);
            if !release(&registry, &sub_id, bus_id) {
                return;
            }
            debug!(connection = %connection, subscription = %sub_id, "subscription ended by bus");
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = outbound.send(ServerFrame::Complete { id: sub_id }) => {}
            }
        });

        debug!(connection = %self.id, subscription = %id, topic = %topic, "subscription started");
        active.insert(
            id,
            ActiveSubscription {
                topic,
                bus_id,
                cancel,
                task,
            },
        );
        Ok(())
    }

    /// Cancel subscription `id` and wait for its forwarder to exit. Returns
    /// false if it was not active.
    async fn stop(&self, id: &str) -> bool {
        let removed = self.active.lock().remove(id);
        match removed {
            Some(subscription) => {
                subscription.shutdown(&self.bus).await;
                debug!(connection = %self.id, subscription = %id, "subscription stopped");
                true
            }
            None => false,
        }
    }

    /// Cancel every subscription of this connection.
    pub fn close(&self) {
        self.closed.cancel();
        let drained: Vec<_> = self.active.lock().drain().collect();
        let count = drained.len();
        for (_, subscription) in drained {
            subscription.abort(&self.bus);
        }
        if count > 0 {
            info!(connection = %self.id, subscriptions = count, "gateway connection closed");
        }
    }

    /// Cancel every subscription and send one `complete` for each that has
    /// not already ended on its own. Never waits on a full outbound queue.
    pub async fn complete_all(&self) {
        let drained: Vec<_> = self.active.lock().drain().collect();
        for (id, subscription) in drained {
            subscription.shutdown(&self.bus).await;
            let frame = ServerFrame::Complete { id: id.clone() };
            match self.outbound.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(connection = %self.id, subscription = %id, "outbound queue full, complete dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(connection = %self.id, "outbound channel closed");
                }
            }
        }
    }

    async fn send(&self, frame: ServerFrame) {
        if self.outbound.send(frame).await.is_err() {
            debug!(connection = %self.id, "outbound channel closed");
        }
    }
}

impl Drop for GatewayConnection {
    fn drop(&mut self) {
        self.close();
    }
}
