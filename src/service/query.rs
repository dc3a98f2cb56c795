//! Read-only listing of messages.

use crate::error::Result;
use crate::store::RecordStore;
use crate::types::Message;
use std::sync::Arc;

/// Serves the initial board state. Never touches the event bus.
pub struct QueryService {
    store: Arc<dyn RecordStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All current messages, in store order.
    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        self.store.list().await
    }

    /// Number of current messages.
    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::NewMessage;

    #[tokio::test]
    async fn test_list_reflects_store() {
        let store = Arc::new(MemoryStore::new());
        let query = QueryService::new(store.clone());
        assert!(query.list_messages().await.unwrap().is_empty());

        let created = store.create(NewMessage::new("A", "hi")).await.unwrap();
        assert_eq!(query.list_messages().await.unwrap(), vec![created]);
        assert_eq!(query.count().await.unwrap(), 1);
    }
}
