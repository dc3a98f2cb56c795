//! Tagged API surface: one variant per query or mutation.

use crate::bus::{EventBus, Subscription, Topic};
use crate::error::{BoardError, Result};
use crate::service::{MutationOptions, MutationService, QueryService};
use crate::store::RecordStore;
use crate::types::{deserialize_optional_id, Message, MessageId, MessagePatch, NewMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A request-response operation, tagged by `op`.
///
/// ```json
/// {"op": "postMessage", "user": "A", "content": "hi", "parentId": null}
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// List every message.
    Messages,
    PostMessage {
        user: String,
        content: String,
        #[serde(
            rename = "parentId",
            default,
            deserialize_with = "deserialize_optional_id"
        )]
        parent_id: Option<MessageId>,
    },
    DeleteMessage {
        id: MessageId,
    },
    UpdateMessage {
        id: MessageId,
        user: String,
        content: String,
    },
}

impl Operation {
    /// Operation name as it appears in the `op` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Messages => "messages",
            Operation::PostMessage { .. } => "postMessage",
            Operation::DeleteMessage { .. } => "deleteMessage",
            Operation::UpdateMessage { .. } => "updateMessage",
        }
    }
}

/// Successful result of an [`Operation`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Output {
    Messages(Vec<Message>),
    Message(Message),
}

/// Error body returned to API callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl From<&BoardError> for ErrorBody {
    fn from(e: &BoardError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

/// Envelope for API responses: `{"data": ...}` or `{"error": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Data(Output),
    Error(ErrorBody),
}

impl From<Result<Output>> for Response {
    fn from(result: Result<Output>) -> Self {
        match result {
            Ok(output) => Response::Data(output),
            Err(e) => Response::Error(ErrorBody::from(&e)),
        }
    }
}

/// The board: query and mutation services plus the event bus they share.
///
/// Constructed once per process. Closing it closes the bus, which ends every
/// open subscription.
pub struct Board {
    queries: QueryService,
    mutations: MutationService,
    bus: Arc<EventBus>,
}

impl Board {
    pub fn new(store: Arc<dyn RecordStore>, bus: Arc<EventBus>, options: MutationOptions) -> Self {
        Self {
            queries: QueryService::new(Arc::clone(&store)),
            mutations: MutationService::with_options(store, Arc::clone(&bus), options),
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    pub fn mutations(&self) -> &MutationService {
        &self.mutations
    }

    /// Open a live stream on one of the mutation topics.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        self.bus.subscribe(topic)
    }

    /// Dispatch one operation.
    pub async fn execute(&self, op: Operation) -> Result<Output> {
        match op {
            Operation::Messages => self.queries.list_messages().await.map(Output::Messages),
            Operation::PostMessage {
                user,
                content,
                parent_id,
            } => self
                .mutations
                .post_message(NewMessage {
                    user,
                    content,
                    parent_id,
                })
                .await
                .map(Output::Message),
            Operation::DeleteMessage { id } => {
                self.mutations.delete_message(id).await.map(Output::Message)
            }
            Operation::UpdateMessage { id, user, content } => self
                .mutations
                .update_message(id, MessagePatch { user, content })
                .await
                .map(Output::Message),
        }
    }

    /// Parse a JSON request body and dispatch it. Malformed bodies are
    /// validation errors.
    pub async fn handle_request(&self, body: &[u8]) -> Result<Output> {
        let op: Operation = serde_json::from_slice(body)?;
        self.execute(op).await
    }

    /// Shut down live delivery.
    pub fn close(&self) {
        self.bus.close();
    }
}
