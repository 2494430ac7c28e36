//! Conversation lifecycle and group membership rules.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::entities::{Conversation, Message};
use crate::repositories::ConversationStore;
use crate::types::{ChatError, ChatResult, UserId};
use crate::utils::{PermissionChecker, Validator};

/// Owns conversation records. All membership and last-message mutations go
/// through here.
#[derive(Clone)]
pub struct ConversationRegistry {
    store: Arc<dyn ConversationStore>,
}

impl ConversationRegistry {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Return the direct conversation between two users, creating it on first
    /// contact. Concurrent callers converge on a single conversation.
    pub async fn find_or_create_direct(&self, user_a: &str, user_b: &str) -> ChatResult<Conversation> {
        if user_a == user_b {
            return Err(ChatError::validation(
                "Cannot start a direct conversation with yourself",
            ));
        }

        if let Some(existing) = self.store.find_direct(user_a, user_b).await? {
            return Ok(existing);
        }

        let conversation = Conversation::direct(user_a, user_b, Utc::now());
        match self.store.insert(&conversation).await {
            Ok(()) => {
                info!(
                    conversation_id = %conversation.id,
                    created_by = %user_a,
                    "created direct conversation"
                );
                Ok(conversation)
            }
            Err(ChatError::Conflict { .. }) => {
                debug!(user_a, user_b, "direct conversation created concurrently, re-reading");
                self.store
                    .find_direct(user_a, user_b)
                    .await?
                    .ok_or_else(|| {
                        ChatError::conflict("direct conversation conflicted but could not be re-read")
                    })
            }
            Err(other) => Err(other),
        }
    }

    /// Create a group named `group_name` holding the creator plus `member_ids`.
    /// The creator is dropped from `member_ids` and duplicates collapse; at
    /// least two other members must remain.
    pub async fn create_group(
        &self,
        creator: &str,
        member_ids: &[UserId],
        group_name: &str,
    ) -> ChatResult<Conversation> {
        let group_name = Validator::group_name(group_name)?;

        let mut participants = vec![creator.to_string()];
        for member in member_ids {
            if !participants.contains(member) {
                participants.push(member.clone());
            }
        }

        if participants.len() < 3 {
            return Err(ChatError::validation(
                "A group needs at least two participants besides its creator",
            ));
        }

        let conversation = Conversation::group(creator, participants, group_name, Utc::now());
        self.store.insert(&conversation).await?;

        info!(
            conversation_id = %conversation.id,
            created_by = %creator,
            participants = conversation.participants.len(),
            "created group conversation"
        );
        Ok(conversation)
    }

    pub async fn add_participants(
        &self,
        conversation_id: &str,
        acting_user: &str,
        new_ids: &[UserId],
    ) -> ChatResult<Conversation> {
        self.administered_group(conversation_id, acting_user).await?;

        if new_ids.is_empty() {
            return Err(ChatError::validation("No participants to add"));
        }

        let updated = self
            .store
            .add_participants(conversation_id, new_ids, Utc::now())
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))?;

        info!(
            conversation_id,
            acting_user,
            participants = updated.participants.len(),
            "added group participants"
        );
        Ok(updated)
    }

    pub async fn remove_participant(
        &self,
        conversation_id: &str,
        acting_user: &str,
        target_id: &str,
    ) -> ChatResult<Conversation> {
        let conversation = self.administered_group(conversation_id, acting_user).await?;
        PermissionChecker::ensure_removable(&conversation, target_id)?;

        let updated = self
            .store
            .remove_participant(conversation_id, target_id, Utc::now())
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))?;

        info!(conversation_id, acting_user, target_id, "removed group participant");
        Ok(updated)
    }

    /// Conversations containing `user_id`, most recently updated first.
    pub async fn list_for_user(&self, user_id: &str) -> ChatResult<Vec<Conversation>> {
        self.store.list_for_user(user_id).await
    }

    pub async fn find(&self, conversation_id: &str) -> ChatResult<Option<Conversation>> {
        self.store.find_by_id(conversation_id).await
    }

    pub async fn get(&self, conversation_id: &str) -> ChatResult<Conversation> {
        self.find(conversation_id)
            .await?
            .ok_or_else(|| ChatError::conversation_not_found(conversation_id))
    }

    /// Advance the last-message pointer to `message` if it is newer than the
    /// current one.
    pub async fn record_last_message(&self, message: &Message) -> ChatResult<bool> {
        self.store.set_last_message(message).await
    }

    /// Loads the conversation and checks, in order: it exists, it is a group,
    /// and `acting_user` created it.
    async fn administered_group(&self, conversation_id: &str, acting_user: &str) -> ChatResult<Conversation> {
        let conversation = self.get(conversation_id).await?;
        PermissionChecker::ensure_group(&conversation)?;
        PermissionChecker::ensure_group_admin(&conversation, acting_user)?;
        Ok(conversation)
    }
}
