//! Event bus types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation event. Each topic is an independent ordered channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "messageAdded")]
    Added,
    #[serde(rename = "messageUpdated")]
    Updated,
    #[serde(rename = "messageDeleted")]
    Deleted,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 3] = [Topic::Added, Topic::Updated, Topic::Deleted];

    /// Subscription field name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Added => "messageAdded",
            Topic::Updated => "messageUpdated",
            Topic::Deleted => "messageDeleted",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the event bus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Max pending payloads per subscriber before it is dropped.
    /// Default: `None` (unbounded).
    ///
    /// With no bound, a subscriber that never drains its queue grows without
    /// limit.
    pub buffer_size: Option<usize>,
}

impl BusConfig {
    /// Bounded queues of `size` payloads per subscriber.
    pub fn bounded(size: usize) -> Self {
        Self {
            buffer_size: Some(size),
        }
    }
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a subscription was removed from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Receiving side went away without unsubscribing.
    Disconnected,
    /// Explicitly unsubscribed.
    Unsubscribed,
    /// The bus was closed.
    BusClosed,
}
