use serde::{Deserialize, Serialize};

use crate::models::MessageKind;

/// Seconds a message stays visible after reveal when the sender picks nothing.
pub const DEFAULT_EXPIRES_IN: u32 = 10;

// -- Messages --

/// Outgoing message envelope handed to the message store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub sender_id: String,
    pub receiver_id: String,
    #[serde(flatten)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
}

impl SendMessageRequest {
    pub fn text(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            kind: MessageKind::Text,
            expires_in: None,
        }
    }

    pub fn with_expires_in(mut self, seconds: u32) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    pub fn effective_expires_in(&self) -> u32 {
        self.expires_in.filter(|s| *s > 0).unwrap_or(DEFAULT_EXPIRES_IN)
    }
}
