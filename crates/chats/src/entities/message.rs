use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::AttachmentRef;
use crate::types::{ConversationId, MessageId, UserId};

/// A persisted message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub content: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    /// Position within the conversation, strictly increasing from 1.
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

/// A validated message awaiting its sequence number.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub content: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    pub fn into_message(self, sequence: i64) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender: self.sender,
            content: self.content,
            attachments: self.attachments,
            sequence,
            created_at: self.created_at,
        }
    }
}
