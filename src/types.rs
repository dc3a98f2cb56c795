//! Core types for the message board.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unique identifier for a message (assigned by the store, never reused).
///
/// Travels on the wire as a decimal string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MessageId)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct MessageIdVisitor;

impl<'de> Visitor<'de> for MessageIdVisitor {
    type Value = MessageId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a message id as a decimal string or integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MessageId, E> {
        Ok(MessageId(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MessageId, E> {
        u64::try_from(v)
            .map(MessageId)
            .map_err(|_| E::custom(format!("invalid message id: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MessageId, E> {
        v.parse()
            .map_err(|_| E::custom(format!("invalid message id: {v:?}")))
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MessageIdVisitor)
    }
}

/// Deserialize an optional id where an empty string means "absent".
pub(crate) fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<MessageId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Id(MessageId),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Id(id)) => Ok(Some(id)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => Err(de::Error::custom(format!("invalid message id: {s:?}"))),
    }
}

/// Milliseconds since Unix epoch.
///
/// Serialized as an opaque decimal string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Timestamp(millis)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map(Timestamp)
            .map_err(|_| de::Error::custom(format!("invalid timestamp: {s:?}")))
    }
}

/// A single message on the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique identifier (assigned by store).
    pub id: MessageId,
    /// Display name of the author.
    pub user: String,
    /// Message body.
    pub content: String,
    /// Message this one replies to. Stored verbatim; may dangle.
    pub parent_id: Option<MessageId>,
    /// When the message was created.
    pub created_at: Timestamp,
}

/// Input for creating a message. The store assigns `id` and `created_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub user: String,
    pub content: String,
    pub parent_id: Option<MessageId>,
}

impl NewMessage {
    pub fn new(user: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            content: content.into(),
            parent_id: None,
        }
    }

    /// Set the parent reference.
    pub fn reply_to(mut self, parent: MessageId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Revisable fields of an existing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePatch {
    pub user: String,
    pub content: String,
}
