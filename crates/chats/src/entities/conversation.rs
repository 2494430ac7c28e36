use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, MessageId, UserId};

/// A direct or group conversation.
///
/// `participants` keeps insertion order with the creator first. For direct
/// conversations it always holds exactly two distinct users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserId>,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub created_by: UserId,
    /// Denormalized pointer to the newest message; may lag behind the log.
    pub last_message: Option<MessageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn direct(initiator: &str, other: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: cuid2::create_id(),
            participants: vec![initiator.to_string(), other.to_string()],
            is_group: false,
            group_name: None,
            created_by: initiator.to_string(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn group(
        creator: &str,
        participants: Vec<UserId>,
        group_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: cuid2::create_id(),
            participants,
            is_group: true,
            group_name: Some(group_name),
            created_by: creator.to_string(),
            last_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}
