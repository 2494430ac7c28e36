//! Hydrated records returned by the chat service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{AttachmentRef, Conversation, Message, UserProfile};
use crate::types::{ConversationId, MessageId, UserId};

/// A conversation with participant identities and its last message resolved.
///
/// `participants` is aligned with `participant_ids`; users the identity store
/// does not know are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: ConversationId,
    pub participant_ids: Vec<UserId>,
    pub participants: Vec<Option<UserProfile>>,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub created_by: UserId,
    pub last_message: Option<MessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A message with its sender identity resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub sender: Option<UserProfile>,
    pub content: Option<String>,
    pub attachments: Vec<AttachmentRef>,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: Message, sender: Option<UserProfile>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender,
            sender,
            content: message.content,
            attachments: message.attachments,
            sequence: message.sequence,
            created_at: message.created_at,
        }
    }
}

impl ConversationView {
    pub fn new(
        conversation: Conversation,
        participants: Vec<Option<UserProfile>>,
        last_message: Option<MessageView>,
    ) -> Self {
        Self {
            id: conversation.id,
            participant_ids: conversation.participants,
            participants,
            is_group: conversation.is_group,
            group_name: conversation.group_name,
            created_by: conversation.created_by,
            last_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}
