//! Mutation service: validate, commit, then publish.

use crate::bus::{EventBus, Topic};
use crate::error::{BoardError, Result};
use crate::store::RecordStore;
use crate::types::{Message, MessageId, MessagePatch, NewMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Options for the mutation service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationOptions {
    /// Reject posts whose `parent_id` does not name an existing message.
    /// Default: false (dangling parents are stored verbatim).
    pub require_parent: bool,
}

/// Applies mutations to the record store and publishes one event per
/// successful mutation.
///
/// The store call is always awaited to completion before publishing, so a
/// subscriber never sees an event for a write that did not commit, and a
/// failed write publishes nothing.
pub struct MutationService {
    store: Arc<dyn RecordStore>,
    bus: Arc<EventBus>,
    options: MutationOptions,
}

impl MutationService {
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<EventBus>) -> Self {
        Self::with_options(store, bus, MutationOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn RecordStore>,
        bus: Arc<EventBus>,
        options: MutationOptions,
    ) -> Self {
        Self {
            store,
            bus,
            options,
        }
    }

    /// Create a message and publish it on [`Topic::Added`].
    #[instrument(skip_all, fields(user = %input.user))]
    pub async fn post_message(&self, input: NewMessage) -> Result<Message> {
        require_non_empty("user", &input.user)?;
        require_non_empty("content", &input.content)?;

        if self.options.require_parent {
            if let Some(parent) = input.parent_id {
                if self.store.get(parent).await?.is_none() {
                    return Err(BoardError::Validation(format!(
                        "parent message {parent} does not exist"
                    )));
                }
            }
        }

        let message = self.store.create(input).await?;
        debug!(id = %message.id, "message created");
        self.bus.publish(Topic::Added, &message);
        Ok(message)
    }

    /// Revise `user`/`content` and publish the result on [`Topic::Updated`].
    #[instrument(skip(self, patch))]
    pub async fn update_message(&self, id: MessageId, patch: MessagePatch) -> Result<Message> {
        require_non_empty("user", &patch.user)?;
        require_non_empty("content", &patch.content)?;

        let message = self.store.update(id, patch).await?;
        debug!(id = %message.id, "message updated");
        self.bus.publish(Topic::Updated, &message);
        Ok(message)
    }

    /// Remove a message and publish its last state on [`Topic::Deleted`].
    #[instrument(skip(self))]
    pub async fn delete_message(&self, id: MessageId) -> Result<Message> {
        let message = self.store.delete(id).await?;
        debug!(id = %message.id, "message deleted");
        self.bus.publish(Topic::Deleted, &message);
        Ok(message)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(BoardError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn make_service() -> (MutationService, Arc<MemoryStore>, Arc<EventBus>) {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::default());
        let service = MutationService::new(store.clone(), bus.clone());
        (service, store, bus)
    }

    #[tokio::test]
    async fn test_post_publishes_added() {
        let (service, _store, bus) = make_service();
        let mut added = bus.subscribe(Topic::Added);

        let message = service
            .post_message(NewMessage::new("A", "hi"))
            .await
            .unwrap();

        assert_eq!(added.try_recv().unwrap(), message);
        assert!(added.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_post_rejects_empty_fields() {
        let (service, store, bus) = make_service();
        let mut added = bus.subscribe(Topic::Added);

        let no_user = service.post_message(NewMessage::new("", "hi")).await;
        assert!(matches!(no_user, Err(BoardError::Validation(_))));

        let no_content = service.post_message(NewMessage::new("A", "")).await;
        assert!(matches!(no_content, Err(BoardError::Validation(_))));

        assert!(store.is_empty());
        assert!(added.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dangling_parent_allowed_by_default() {
        let (service, _store, _bus) = make_service();
        let message = service
            .post_message(NewMessage::new("A", "reply").reply_to(MessageId(404)))
            .await
            .unwrap();
        assert_eq!(message.parent_id, Some(MessageId(404)));
    }

    #[tokio::test]
    async fn test_require_parent_rejects_dangling() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::default());
        let service = MutationService::with_options(
            store.clone(),
            bus.clone(),
            MutationOptions {
                require_parent: true,
            },
        );
        let mut added = bus.subscribe(Topic::Added);

        let result = service
            .post_message(NewMessage::new("A", "reply").reply_to(MessageId(404)))
            .await;
        assert!(matches!(result, Err(BoardError::Validation(_))));
        assert!(store.is_empty());
        assert!(added.try_recv().is_err());

        let root = service
            .post_message(NewMessage::new("A", "root"))
            .await
            .unwrap();
        let reply = service
            .post_message(NewMessage::new("B", "reply").reply_to(root.id))
            .await
            .unwrap();
        assert_eq!(reply.parent_id, Some(root.id));
    }

    #[tokio::test]
    async fn test_update_publishes_updated() {
        let (service, _store, bus) = make_service();
        let created = service
            .post_message(NewMessage::new("A", "hi"))
            .await
            .unwrap();
        let mut updated = bus.subscribe(Topic::Updated);

        let result = service
            .update_message(
                created.id,
                MessagePatch {
                    user: "A".to_string(),
                    content: "hello".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.content, "hello");
        assert_eq!(updated.try_recv().unwrap(), result);
    }

    #[tokio::test]
    async fn test_update_missing_publishes_nothing() {
        let (service, _store, bus) = make_service();
        let mut updated = bus.subscribe(Topic::Updated);

        let result = service
            .update_message(
                MessageId(9),
                MessagePatch {
                    user: "A".to_string(),
                    content: "x".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(BoardError::NotFound(MessageId(9)))));
        assert!(updated.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_validates_before_lookup() {
        let (service, _store, _bus) = make_service();
        let result = service
            .update_message(
                MessageId(9),
                MessagePatch {
                    user: "A".to_string(),
                    content: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(BoardError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_publishes_last_state() {
        let (service, store, bus) = make_service();
        let created = service
            .post_message(NewMessage::new("A", "bye"))
            .await
            .unwrap();
        let mut deleted = bus.subscribe(Topic::Deleted);

        let result = service.delete_message(created.id).await.unwrap();
        assert_eq!(result, created);
        assert_eq!(deleted.try_recv().unwrap(), created);
        assert!(store.is_empty());

        let again = service.delete_message(created.id).await;
        assert!(matches!(again, Err(BoardError::NotFound(_))));
        assert!(deleted.try_recv().is_err());
    }
}
