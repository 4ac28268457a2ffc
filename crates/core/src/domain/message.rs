// Message Domain Model

use serde::{Deserialize, Serialize};

/// Opaque data carried between workers
pub type Payload = serde_json::Value;

/// Unit of transfer on a queue.
///
/// `Terminate` is a variant of its own, so no payload can ever be mistaken
/// for the end-of-input marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Message {
    Data(Payload),
    Terminate,
}

impl Message {
    pub fn data(payload: impl Into<Payload>) -> Self {
        Message::Data(payload.into())
    }

    pub fn is_terminate(&self) -> bool {
        matches!(self, Message::Terminate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_terminate_never_equals_data() {
        // A payload spelling out the old string marker is still plain data
        let looks_like_marker = Message::data("DONE");
        assert!(!looks_like_marker.is_terminate());
        assert_ne!(looks_like_marker, Message::Terminate);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let encoded = serde_json::to_value(Message::data(json!({"v": 1}))).unwrap();
        assert_eq!(encoded, json!({"kind": "data", "payload": {"v": 1}}));

        let encoded = serde_json::to_value(Message::Terminate).unwrap();
        assert_eq!(encoded, json!({"kind": "terminate"}));
    }
}
