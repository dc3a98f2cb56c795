//! Record store collaborator.
//!
//! The board treats persistence as an external, transactional service. This
//! module defines the contract the mutation and query services rely on:
//!
//! - Every method is durable on return: once a call resolves `Ok`, subsequent
//!   reads observe the write.
//! - Writes to a single record are serialized by the store itself.
//! - `update` and `delete` report a missing id as [`BoardError::NotFound`];
//!   any other failure is [`BoardError::Store`].
//!
//! [`MemoryStore`] is the in-process implementation used by the server binary
//! and the tests.
//!
//! [`BoardError::NotFound`]: crate::error::BoardError::NotFound
//! [`BoardError::Store`]: crate::error::BoardError::Store

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use crate::types::{Message, MessageId, MessagePatch, NewMessage};
use async_trait::async_trait;

/// Durable storage of messages keyed by id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record, assigning its id and creation time.
    async fn create(&self, input: NewMessage) -> Result<Message>;

    /// Fetch a record by id.
    async fn get(&self, id: MessageId) -> Result<Option<Message>>;

    /// All current records, in store order.
    async fn list(&self) -> Result<Vec<Message>>;

    /// Replace the revisable fields of a record.
    async fn update(&self, id: MessageId, patch: MessagePatch) -> Result<Message>;

    /// Remove a record permanently, returning its last state.
    async fn delete(&self, id: MessageId) -> Result<Message>;

    /// Number of current records.
    async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }
}
