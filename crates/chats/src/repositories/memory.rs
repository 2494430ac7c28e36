//! Process-local store implementations backed by `tokio::sync::RwLock` maps.
//!
//! Used by tests and by embedders that do not need durability. They honour
//! the same contracts as the SQLite stores: direct-pair uniqueness,
//! per-conversation sequences and a forward-only last-message pointer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parley_database::direct_key;
use tokio::sync::RwLock;

use crate::entities::{AttachmentRef, Conversation, Message, NewMessage, RawAttachment, UserProfile};
use crate::repositories::{AttachmentStore, ConversationStore, IdentityStore, MessageStore};
use crate::types::{ChatError, ChatResult, UserId};
use crate::utils::Validator;

#[derive(Default)]
struct ConversationState {
    conversations: HashMap<String, Conversation>,
    direct_index: HashMap<String, String>,
    pointer_sequence: HashMap<String, i64>,
}

#[derive(Default, Clone)]
pub struct MemoryConversationStore {
    state: Arc<RwLock<ConversationState>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn insert(&self, conversation: &Conversation) -> ChatResult<()> {
        let mut state = self.state.write().await;

        if !conversation.is_group {
            let [a, b] = conversation.participants.as_slice() else {
                return Err(ChatError::storage(
                    "direct conversation requires exactly two participants",
                ));
            };
            let key = direct_key(a, b);
            if state.direct_index.contains_key(&key) {
                return Err(ChatError::conflict(format!(
                    "direct conversation already exists for {key}"
                )));
            }
            state.direct_index.insert(key, conversation.id.clone());
        }

        state
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Conversation>> {
        let state = self.state.read().await;
        Ok(state.conversations.get(id).cloned())
    }

    async fn find_direct(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Conversation>> {
        let state = self.state.read().await;
        Ok(state
            .direct_index
            .get(&direct_key(user_a, user_b))
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &str) -> ChatResult<Vec<Conversation>> {
        let state = self.state.read().await;
        let mut found: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn add_participants(
        &self,
        id: &str,
        user_ids: &[UserId],
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        let mut state = self.state.write().await;
        let Some(conversation) = state.conversations.get_mut(id) else {
            return Ok(None);
        };

        for user_id in user_ids {
            if !conversation.is_participant(user_id) {
                conversation.participants.push(user_id.clone());
            }
        }
        conversation.updated_at = at;
        Ok(Some(conversation.clone()))
    }

    async fn remove_participant(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        let mut state = self.state.write().await;
        let Some(conversation) = state.conversations.get_mut(id) else {
            return Ok(None);
        };

        conversation.participants.retain(|p| p != user_id);
        conversation.updated_at = at;
        Ok(Some(conversation.clone()))
    }

    async fn set_last_message(&self, message: &Message) -> ChatResult<bool> {
        let mut state = self.state.write().await;
        let current = state
            .pointer_sequence
            .get(&message.conversation_id)
            .copied()
            .unwrap_or(0);
        if current >= message.sequence {
            return Ok(false);
        }

        let Some(conversation) = state.conversations.get_mut(&message.conversation_id) else {
            return Ok(false);
        };
        conversation.last_message = Some(message.id.clone());
        conversation.updated_at = conversation.updated_at.max(message.created_at);

        state
            .pointer_sequence
            .insert(message.conversation_id.clone(), message.sequence);
        Ok(true)
    }
}

#[derive(Default, Clone)]
pub struct MemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, Vec<Message>>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, message: NewMessage) -> ChatResult<Message> {
        let mut messages = self.messages.write().await;
        let log = messages.entry(message.conversation_id.clone()).or_default();
        let sequence = log.last().map(|m| m.sequence).unwrap_or(0) + 1;
        let message = message.into_message(sequence);
        log.push(message.clone());
        Ok(message)
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Message>> {
        let messages = self.messages.read().await;
        Ok(messages.values().flatten().find(|m| m.id == id).cloned())
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> ChatResult<Vec<Message>> {
        let messages = self.messages.read().await;
        Ok(messages.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn latest_for_conversation(&self, conversation_id: &str) -> ChatResult<Option<Message>> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(conversation_id)
            .and_then(|log| log.last())
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct MemoryIdentityStore {
    users: Arc<RwLock<HashMap<UserId, UserProfile>>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile.
    pub async fn insert(&self, profile: UserProfile) {
        let mut users = self.users.write().await;
        users.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_id(&self, id: &str) -> ChatResult<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> ChatResult<Option<UserProfile>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> ChatResult<Vec<UserProfile>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}

/// Keeps uploaded blobs in memory under `memory://attachments/<id>/<name>`.
#[derive(Default, Clone)]
pub struct MemoryAttachmentStore {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, url: &str) -> Option<Bytes> {
        let blobs = self.blobs.read().await;
        blobs.get(url).cloned()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn store(&self, attachment: RawAttachment) -> ChatResult<AttachmentRef> {
        Validator::file_name(&attachment.file_name)?;
        if attachment.data.is_empty() {
            return Err(ChatError::attachment("Attachment is empty"));
        }

        let url = format!(
            "memory://attachments/{}/{}",
            cuid2::create_id(),
            attachment.file_name
        );
        let media_type = attachment.media_type();

        let mut blobs = self.blobs.write().await;
        blobs.insert(url.clone(), attachment.data);

        Ok(AttachmentRef {
            url,
            name: attachment.file_name,
            media_type,
        })
    }

    async fn remove(&self, attachment: &AttachmentRef) -> ChatResult<()> {
        let mut blobs = self.blobs.write().await;
        blobs.remove(&attachment.url);
        Ok(())
    }
}
