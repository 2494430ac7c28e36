//! Message entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: Option<String>,
    pub attachments: Vec<MessageAttachment>,
    /// Per-conversation position assigned at insert, starting at 1
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageAttachment {
    pub url: String,
    pub name: String,
    pub media_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: Option<String>,
    pub attachments: Vec<CreateAttachmentRequest>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttachmentRequest {
    pub url: String,
    pub name: String,
    pub media_type: String,
}

impl From<CreateAttachmentRequest> for MessageAttachment {
    fn from(request: CreateAttachmentRequest) -> Self {
        Self {
            url: request.url,
            name: request.name,
            media_type: request.media_type,
        }
    }
}
