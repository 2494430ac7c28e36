//! Storage seams for the chat core.
//!
//! The services only talk to these traits. SQLite-backed implementations
//! live in [`sqlite`], process-local ones in [`memory`], and uploaded blobs
//! go to disk through [`local_attachments`].

pub mod local_attachments;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{AttachmentRef, Conversation, Message, NewMessage, RawAttachment, UserProfile};
use crate::types::{ChatResult, UserId};

pub use local_attachments::LocalAttachmentStore;
pub use memory::{MemoryAttachmentStore, MemoryConversationStore, MemoryIdentityStore, MemoryMessageStore};
pub use sqlite::{SqliteConversationStore, SqliteIdentityStore, SqliteMessageStore};

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation. A second direct conversation for the same
    /// unordered pair fails with a conflict.
    async fn insert(&self, conversation: &Conversation) -> ChatResult<()>;

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Conversation>>;

    async fn find_direct(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Conversation>>;

    /// Conversations containing `user_id`, most recently updated first.
    async fn list_for_user(&self, user_id: &str) -> ChatResult<Vec<Conversation>>;

    /// Add with set semantics, bump `updated_at` and return the new state.
    async fn add_participants(
        &self,
        id: &str,
        user_ids: &[UserId],
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>>;

    async fn remove_participant(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>>;

    /// Move the last-message pointer to `message` unless it already points
    /// at a later one. Returns whether the pointer moved.
    async fn set_last_message(&self, message: &Message) -> ChatResult<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message, assigning the next sequence of its conversation.
    async fn insert(&self, message: NewMessage) -> ChatResult<Message>;

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Message>>;

    /// Full history in ascending sequence order.
    async fn list_for_conversation(&self, conversation_id: &str) -> ChatResult<Vec<Message>>;

    async fn latest_for_conversation(&self, conversation_id: &str) -> ChatResult<Option<Message>>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> ChatResult<Option<UserProfile>>;

    async fn find_by_username(&self, username: &str) -> ChatResult<Option<UserProfile>>;

    /// Batched lookup; unknown ids are omitted from the result.
    async fn find_by_ids(&self, ids: &[UserId]) -> ChatResult<Vec<UserProfile>>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn store(&self, attachment: RawAttachment) -> ChatResult<AttachmentRef>;

    /// Delete a blob previously returned by `store`. Removing a blob that is
    /// already gone succeeds.
    async fn remove(&self, attachment: &AttachmentRef) -> ChatResult<()>;
}
