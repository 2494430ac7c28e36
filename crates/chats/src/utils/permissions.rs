//! Permission checking utilities.

use crate::entities::Conversation;
use crate::types::{ChatError, ChatResult};

/// Permission checks over a loaded conversation
pub struct PermissionChecker;

impl PermissionChecker {
    /// Membership changes are only defined for group conversations.
    pub fn ensure_group(conversation: &Conversation) -> ChatResult<()> {
        if !conversation.is_group {
            return Err(ChatError::invalid_operation(
                "Participants can only be changed in group conversations",
            ));
        }
        Ok(())
    }

    /// Only the creator administers a group.
    pub fn ensure_group_admin(conversation: &Conversation, user_id: &str) -> ChatResult<()> {
        if conversation.created_by != user_id {
            return Err(ChatError::forbidden(
                "Only the group creator can manage participants",
            ));
        }
        Ok(())
    }

    pub fn ensure_participant(conversation: &Conversation, user_id: &str) -> ChatResult<()> {
        if !conversation.is_participant(user_id) {
            return Err(ChatError::forbidden(
                "User is not a participant of this conversation",
            ));
        }
        Ok(())
    }

    pub fn ensure_removable(conversation: &Conversation, target_id: &str) -> ChatResult<()> {
        if conversation.created_by == target_id {
            return Err(ChatError::invalid_operation(
                "The group creator cannot be removed",
            ));
        }
        if !conversation.is_participant(target_id) {
            return Err(ChatError::participant_not_found(target_id));
        }
        Ok(())
    }
}
