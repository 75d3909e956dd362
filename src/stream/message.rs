//! Wire format of inbound stream messages
//!
//! The server frames every stream message as a JSON envelope
//! `{"handler": <string>, "data": <value>}`. Only two handler values are
//! meaningful to this crate; everything else is ignored so the server can
//! add message types without breaking old clients.

use serde::Deserialize;

/// Handler tag for topic update prompts
pub const HANDLER_UPDATE_PROMPT: &str = "update_prompt";

/// Handler tag for keepalive counter messages
pub const HANDLER_KEEPALIVE: &str = "keepalive";

/// JSON envelope carried by every stream message
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    /// Message type tag
    pub handler: String,

    /// Handler-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Classified meaning of a stream message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// A topic has changed server-side; listeners should re-fetch
    Update { topic: String },

    /// Periodic liveness counter; gaps indicate missed messages
    Keepalive { count: u64 },

    /// Recognized envelope, unrecognized handler
    Ignored,

    /// Known handler with a payload of the wrong shape
    Malformed,
}

impl StreamMessage {
    /// Parse a raw text frame into an envelope
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Classify the envelope into its routing meaning
    pub fn classify(&self) -> MessageKind {
        match self.handler.as_str() {
            HANDLER_UPDATE_PROMPT => match self.data.as_str() {
                Some(topic) => MessageKind::Update {
                    topic: topic.to_string(),
                },
                None => MessageKind::Malformed,
            },
            HANDLER_KEEPALIVE => match self.data.as_u64() {
                Some(count) => MessageKind::Keepalive { count },
                None => MessageKind::Malformed,
            },
            _ => MessageKind::Ignored,
        }
    }
}
