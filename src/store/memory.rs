//! In-process record store.

use crate::error::{BoardError, Result};
use crate::types::{Message, MessageId, MessagePatch, NewMessage, Timestamp};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::RecordStore;

/// Record store backed by an in-memory ordered map.
///
/// Ids are allocated from a monotonic counter, so key order is insertion
/// order and ids are never reused, even after deletion.
pub struct MemoryStore {
    /// Records by id.
    records: RwLock<BTreeMap<MessageId, Message>>,
    /// Counter for generating message ids.
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store. The first message gets id 1.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, input: NewMessage) -> Result<Message> {
        let id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let message = Message {
            id,
            user: input.user,
            content: input.content,
            parent_id: input.parent_id,
            created_at: Timestamp::now(),
        };

        self.records.write().insert(id, message.clone());
        Ok(message)
    }

    async fn get(&self, id: MessageId) -> Result<Option<Message>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Message>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn update(&self, id: MessageId, patch: MessagePatch) -> Result<Message> {
        let mut records = self.records.write();
        let message = records.get_mut(&id).ok_or(BoardError::NotFound(id))?;
        message.user = patch.user;
        message.content = patch.content;
        Ok(message.clone())
    }

    async fn delete(&self, id: MessageId) -> Result<Message> {
        self.records
            .write()
            .remove(&id)
            .ok_or(BoardError::NotFound(id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.len())
    }
}
