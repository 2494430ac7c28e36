#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_chats::repositories::{
    MemoryAttachmentStore, MemoryConversationStore, MemoryIdentityStore, MemoryMessageStore,
};
use parley_chats::{
    AttachmentRef, AttachmentStore, ChatError, ChatResult, ChatService, Conversation,
    ConversationStore, IdentityStore, Message, MessageStore, NewMessage, RawAttachment,
    UserProfile, UserStatus,
};

/// Uploads with this file name are refused by [`CountingAttachmentStore`].
pub const REJECTED_UPLOAD: &str = "rejected.bin";

pub fn profile(id: &str, username: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        profile_picture: None,
        status: UserStatus::Online,
    }
}

pub fn names(usernames: &[&str]) -> Vec<String> {
    usernames.iter().map(|s| s.to_string()).collect()
}

/// Counts uploads and removals so tests can assert what was stored.
#[derive(Default, Clone)]
pub struct CountingAttachmentStore {
    pub inner: MemoryAttachmentStore,
    pub uploads: Arc<AtomicUsize>,
    pub removals: Arc<AtomicUsize>,
}

#[async_trait]
impl AttachmentStore for CountingAttachmentStore {
    async fn store(&self, attachment: RawAttachment) -> ChatResult<AttachmentRef> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if attachment.file_name == REJECTED_UPLOAD {
            return Err(ChatError::attachment("upload refused"));
        }
        self.inner.store(attachment).await
    }

    async fn remove(&self, attachment: &AttachmentRef) -> ChatResult<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(attachment).await
    }
}

/// Delegates to an in-memory store but can be told to fail id lookups.
/// Username resolution keeps working.
#[derive(Default, Clone)]
pub struct FlakyIdentityStore {
    pub inner: MemoryIdentityStore,
    pub fail_lookups: Arc<AtomicBool>,
}

impl FlakyIdentityStore {
    fn check(&self) -> ChatResult<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ChatError::storage("identity service unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for FlakyIdentityStore {
    async fn find_by_id(&self, id: &str) -> ChatResult<Option<UserProfile>> {
        self.check()?;
        self.inner.find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> ChatResult<Option<UserProfile>> {
        self.inner.find_by_username(username).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> ChatResult<Vec<UserProfile>> {
        self.check()?;
        self.inner.find_by_ids(ids).await
    }
}

/// Delegates to an in-memory store but can be told to fail inserts or
/// single-message lookups.
#[derive(Default, Clone)]
pub struct FlakyMessageStore {
    inner: MemoryMessageStore,
    pub fail_inserts: Arc<AtomicBool>,
    pub fail_lookups: Arc<AtomicBool>,
}

#[async_trait]
impl MessageStore for FlakyMessageStore {
    async fn insert(&self, message: NewMessage) -> ChatResult<Message> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(ChatError::storage("message store unavailable"));
        }
        self.inner.insert(message).await
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Message>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ChatError::storage("message store unavailable"));
        }
        self.inner.find_by_id(id).await
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> ChatResult<Vec<Message>> {
        self.inner.list_for_conversation(conversation_id).await
    }

    async fn latest_for_conversation(&self, conversation_id: &str) -> ChatResult<Option<Message>> {
        self.inner.latest_for_conversation(conversation_id).await
    }
}

/// Delegates to an in-memory store but can be told to fail pointer updates.
#[derive(Default, Clone)]
pub struct FlakyConversationStore {
    inner: MemoryConversationStore,
    pub fail_pointer_updates: Arc<AtomicBool>,
}

#[async_trait]
impl ConversationStore for FlakyConversationStore {
    async fn insert(&self, conversation: &Conversation) -> ChatResult<()> {
        self.inner.insert(conversation).await
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Conversation>> {
        self.inner.find_by_id(id).await
    }

    async fn find_direct(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Conversation>> {
        self.inner.find_direct(user_a, user_b).await
    }

    async fn list_for_user(&self, user_id: &str) -> ChatResult<Vec<Conversation>> {
        self.inner.list_for_user(user_id).await
    }

    async fn add_participants(
        &self,
        id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        self.inner.add_participants(id, user_ids, at).await
    }

    async fn remove_participant(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        self.inner.remove_participant(id, user_id, at).await
    }

    async fn set_last_message(&self, message: &Message) -> ChatResult<bool> {
        if self.fail_pointer_updates.load(Ordering::SeqCst) {
            return Err(ChatError::storage("simulated outage"));
        }
        self.inner.set_last_message(message).await
    }
}

pub struct Harness {
    pub service: ChatService,
    pub identities: FlakyIdentityStore,
    pub attachments: CountingAttachmentStore,
    pub conversations: FlakyConversationStore,
    pub messages: FlakyMessageStore,
}

/// In-memory service with alice, bob, carol and dave registered.
pub async fn harness() -> Harness {
    let identities = FlakyIdentityStore::default();
    for (id, username) in [("u-alice", "alice"), ("u-bob", "bob"), ("u-carol", "carol"), ("u-dave", "dave")] {
        identities.inner.insert(profile(id, username)).await;
    }

    let attachments = CountingAttachmentStore::default();
    let conversations = FlakyConversationStore::default();
    let messages = FlakyMessageStore::default();

    let service = ChatService::new(
        Arc::new(conversations.clone()),
        Arc::new(messages.clone()),
        Arc::new(identities.clone()),
        Arc::new(attachments.clone()),
    );

    Harness {
        service,
        identities,
        attachments,
        conversations,
        messages,
    }
}
