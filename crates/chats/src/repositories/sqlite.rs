//! Store implementations over the `parley-database` repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_database::{
    self as db, ConversationRepository, CreateAttachmentRequest, CreateMessageRequest,
    DatabaseError, MessageRepository, UserRepository,
};
use sqlx::SqlitePool;

use crate::entities::{AttachmentRef, Conversation, Message, NewMessage, UserProfile};
use crate::repositories::{ConversationStore, IdentityStore, MessageStore};
use crate::types::{ChatError, ChatResult, UserId};

impl From<db::Conversation> for Conversation {
    fn from(row: db::Conversation) -> Self {
        Self {
            id: row.id,
            participants: row.participants,
            is_group: row.is_group,
            group_name: row.group_name,
            created_by: row.created_by,
            last_message: row.last_message_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&Conversation> for db::Conversation {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id.clone(),
            participants: conversation.participants.clone(),
            is_group: conversation.is_group,
            group_name: conversation.group_name.clone(),
            created_by: conversation.created_by.clone(),
            last_message_id: conversation.last_message.clone(),
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        }
    }
}

impl From<db::Message> for Message {
    fn from(row: db::Message) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender: row.sender_id,
            content: row.content,
            attachments: row
                .attachments
                .into_iter()
                .map(|a| AttachmentRef {
                    url: a.url,
                    name: a.name,
                    media_type: a.media_type,
                })
                .collect(),
            sequence: row.seq,
            created_at: row.created_at,
        }
    }
}

impl From<db::User> for UserProfile {
    fn from(user: db::User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            profile_picture: user.profile_picture,
            status: user.status,
        }
    }
}

#[derive(Clone)]
pub struct SqliteConversationStore {
    repository: ConversationRepository,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: ConversationRepository::new(pool),
        }
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn insert(&self, conversation: &Conversation) -> ChatResult<()> {
        self.repository
            .insert(&db::Conversation::from(conversation))
            .await
            .map_err(ChatError::from)
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Conversation>> {
        Ok(self.repository.find_by_id(id).await?.map(Into::into))
    }

    async fn find_direct(&self, user_a: &str, user_b: &str) -> ChatResult<Option<Conversation>> {
        Ok(self
            .repository
            .find_direct(user_a, user_b)
            .await?
            .map(Into::into))
    }

    async fn list_for_user(&self, user_id: &str) -> ChatResult<Vec<Conversation>> {
        Ok(self
            .repository
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn add_participants(
        &self,
        id: &str,
        user_ids: &[UserId],
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        Ok(self
            .repository
            .add_participants(id, user_ids, at)
            .await?
            .map(Into::into))
    }

    async fn remove_participant(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> ChatResult<Option<Conversation>> {
        Ok(self
            .repository
            .remove_participant(id, user_id, at)
            .await?
            .map(Into::into))
    }

    async fn set_last_message(&self, message: &Message) -> ChatResult<bool> {
        self.repository
            .set_last_message(
                &message.conversation_id,
                &message.id,
                message.sequence,
                message.created_at,
            )
            .await
            .map_err(ChatError::from)
    }
}

#[derive(Clone)]
pub struct SqliteMessageStore {
    repository: MessageRepository,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: MessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert(&self, message: NewMessage) -> ChatResult<Message> {
        let request = CreateMessageRequest {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender,
            content: message.content,
            attachments: message
                .attachments
                .into_iter()
                .map(|a| CreateAttachmentRequest {
                    url: a.url,
                    name: a.name,
                    media_type: a.media_type,
                })
                .collect(),
            created_at: message.created_at,
        };

        match self.repository.create(&request).await {
            Ok(row) => Ok(row.into()),
            Err(DatabaseError::NotFound(_)) => {
                Err(ChatError::conversation_not_found(request.conversation_id))
            }
            Err(DatabaseError::Duplicate(reason)) => Err(ChatError::conflict(format!(
                "message sequence contended: {reason}"
            ))),
            Err(other) => Err(other.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> ChatResult<Option<Message>> {
        Ok(self.repository.find_by_id(id).await?.map(Into::into))
    }

    async fn list_for_conversation(&self, conversation_id: &str) -> ChatResult<Vec<Message>> {
        Ok(self
            .repository
            .list_for_conversation(conversation_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn latest_for_conversation(&self, conversation_id: &str) -> ChatResult<Option<Message>> {
        Ok(self
            .repository
            .latest_for_conversation(conversation_id)
            .await?
            .map(Into::into))
    }
}

#[derive(Clone)]
pub struct SqliteIdentityStore {
    repository: UserRepository,
}

impl SqliteIdentityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            repository: UserRepository::new(pool),
        }
    }
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn find_by_id(&self, id: &str) -> ChatResult<Option<UserProfile>> {
        Ok(self.repository.find_by_id(id).await?.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> ChatResult<Option<UserProfile>> {
        Ok(self
            .repository
            .find_by_username(username)
            .await?
            .map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[UserId]) -> ChatResult<Vec<UserProfile>> {
        Ok(self
            .repository
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
