//! Subscription frame protocol.
//!
//! JSON text frames tagged by `type`. Each subscription is keyed by an id the
//! client picks when it sends `start`; every `data` frame carries that id.

use crate::bus::Topic;
use crate::types::Message;
use serde::{Deserialize, Serialize};

/// Frames sent by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ConnectionInit {
        /// Connection parameters. Accepted and ignored.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<serde_json::Value>,
    },
    /// Open a subscription on `payload.topic` under `id`.
    Start { id: String, payload: StartPayload },
    /// Cancel the subscription `id`.
    Stop { id: String },
    /// Close the whole connection.
    ConnectionTerminate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {
    pub topic: Topic,
}

/// Frames sent by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConnectionAck,
    /// One event for subscription `id`.
    Data {
        id: String,
        topic: Topic,
        payload: Message,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        payload: ErrorPayload,
    },
    /// Subscription `id` has ended and will send nothing more.
    Complete { id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}

impl ServerFrame {
    pub fn error(id: Option<String>, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            id,
            payload: ErrorPayload {
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageId, Timestamp};
    use serde_json::json;

    #[test]
    fn test_parse_start() {
        let frame: ClientFrame = serde_json::from_value(json!({
            "type": "start", "id": "1", "payload": {"topic": "messageAdded"}
        }))
        .unwrap();
        assert_eq!(
            frame,
            ClientFrame::Start {
                id: "1".to_string(),
                payload: StartPayload {
                    topic: Topic::Added
                },
            }
        );
    }

    #[test]
    fn test_parse_control_frames() {
        let init: ClientFrame =
            serde_json::from_value(json!({"type": "connection_init", "payload": {}})).unwrap();
        assert!(matches!(init, ClientFrame::ConnectionInit { .. }));

        let bare: ClientFrame =
            serde_json::from_value(json!({"type": "connection_init"})).unwrap();
        assert_eq!(bare, ClientFrame::ConnectionInit { payload: None });

        let stop: ClientFrame = serde_json::from_value(json!({"type": "stop", "id": "9"})).unwrap();
        assert_eq!(stop, ClientFrame::Stop { id: "9".to_string() });
    }

    #[test]
    fn test_unknown_topic_rejected() {
        let result = serde_json::from_value::<ClientFrame>(json!({
            "type": "start", "id": "1", "payload": {"topic": "messageEdited"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_data_frame_shape() {
        let frame = ServerFrame::Data {
            id: "1".to_string(),
            topic: Topic::Deleted,
            payload: Message {
                id: MessageId(1),
                user: "A".to_string(),
                content: "hi".to_string(),
                parent_id: None,
                created_at: Timestamp(5),
            },
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["type"], "data");
        assert_eq!(value["id"], "1");
        assert_eq!(value["topic"], "messageDeleted");
        assert_eq!(value["payload"]["id"], "1");
    }

    #[test]
    fn test_error_frame_omits_missing_id() {
        let value = serde_json::to_value(ServerFrame::error(None, "bad frame")).unwrap();
        assert_eq!(value, json!({"type": "error", "payload": {"message": "bad frame"}}));
    }
}
