//! Append-only message history per conversation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::entities::{AttachmentRef, Conversation, Message, NewMessage};
use crate::repositories::MessageStore;
use crate::services::ConversationRegistry;
use crate::types::{ChatError, ChatResult};
use crate::utils::Validator;

#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn MessageStore>,
    registry: ConversationRegistry,
}

impl MessageLog {
    pub fn new(store: Arc<dyn MessageStore>, registry: ConversationRegistry) -> Self {
        Self { store, registry }
    }

    /// Persist a message and then advance the conversation's last-message
    /// pointer.
    ///
    /// The pointer update is a separate step. If it fails the message is
    /// still returned and the pointer is left for
    /// [`MessageLog::reconcile_last_message`] to repair.
    pub async fn append(
        &self,
        conversation_id: &str,
        sender: &str,
        content: Option<&str>,
        attachments: Vec<AttachmentRef>,
    ) -> ChatResult<Message> {
        let content = Validator::message_content(content)?;
        Validator::message_payload(content.as_deref(), attachments.len())?;

        if self.registry.find(conversation_id).await?.is_none() {
            return Err(ChatError::conversation_not_found(conversation_id));
        }

        let message = self
            .store
            .insert(NewMessage {
                id: cuid2::create_id(),
                conversation_id: conversation_id.to_string(),
                sender: sender.to_string(),
                content,
                attachments,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            message_id = %message.id,
            conversation_id,
            sender,
            sequence = message.sequence,
            attachments = message.attachments.len(),
            "appended message"
        );

        if let Err(error) = self.registry.record_last_message(&message).await {
            warn!(
                conversation_id,
                message_id = %message.id,
                %error,
                "failed to update last message pointer"
            );
        }

        Ok(message)
    }

    /// Full history in creation order.
    pub async fn list_for_conversation(&self, conversation_id: &str) -> ChatResult<Vec<Message>> {
        self.store.list_for_conversation(conversation_id).await
    }

    pub async fn get(&self, message_id: &str) -> ChatResult<Option<Message>> {
        self.store.find_by_id(message_id).await
    }

    /// Newest message of a conversation, if any.
    pub async fn latest(&self, conversation_id: &str) -> ChatResult<Option<Message>> {
        self.store.latest_for_conversation(conversation_id).await
    }

    /// Point the conversation at its newest logged message, repairing a
    /// pointer left behind by a failed update.
    pub async fn reconcile_last_message(&self, conversation_id: &str) -> ChatResult<Conversation> {
        let conversation = self.registry.get(conversation_id).await?;

        let Some(latest) = self.latest(conversation_id).await? else {
            return Ok(conversation);
        };

        if self.registry.record_last_message(&latest).await? {
            info!(conversation_id, message_id = %latest.id, "reconciled last message pointer");
        }

        self.registry.get(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{MemoryConversationStore, MemoryMessageStore};
    use crate::types::ErrorKind;

    async fn setup() -> (MessageLog, ConversationRegistry, Conversation) {
        let registry = ConversationRegistry::new(Arc::new(MemoryConversationStore::new()));
        let log = MessageLog::new(Arc::new(MemoryMessageStore::new()), registry.clone());
        let conversation = registry.find_or_create_direct("alice", "bob").await.unwrap();
        (log, registry, conversation)
    }

    fn image() -> AttachmentRef {
        AttachmentRef {
            url: "/uploads/x-cat.png".into(),
            name: "cat.png".into(),
            media_type: "image/png".into(),
        }
    }

    #[tokio::test]
    async fn test_append_updates_last_message() {
        let (log, registry, conversation) = setup().await;

        let message = log.append(&conversation.id, "alice", Some("hi"), Vec::new()).await.unwrap();

        let history = log.list_for_conversation(&conversation.id).await.unwrap();
        assert_eq!(history.last().map(|m| m.id.as_str()), Some(message.id.as_str()));

        let stored = registry.get(&conversation.id).await.unwrap();
        assert_eq!(stored.last_message, Some(message.id));
        assert!(stored.updated_at >= conversation.updated_at);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let (log, _, conversation) = setup().await;

        let err = log.append(&conversation.id, "alice", None, Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = log
            .append(&conversation.id, "alice", Some("   "), Vec::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_attachment_only_message_has_no_content() {
        let (log, _, conversation) = setup().await;

        let message = log
            .append(&conversation.id, "bob", Some("  "), vec![image()])
            .await
            .unwrap();
        assert_eq!(message.content, None);
        assert_eq!(message.attachments, vec![image()]);
    }

    #[tokio::test]
    async fn test_append_to_unknown_conversation_is_not_found() {
        let (log, _, _) = setup().await;
        let err = log.append("ghost", "alice", Some("hi"), Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_history_is_in_creation_order() {
        let (log, _, conversation) = setup().await;
        for text in ["one", "two", "three"] {
            log.append(&conversation.id, "alice", Some(text), Vec::new()).await.unwrap();
        }

        let contents: Vec<_> = log
            .list_for_conversation(&conversation.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| (m.sequence, m.content.unwrap_or_default()))
            .collect();
        assert_eq!(
            contents,
            vec![(1, "one".to_string()), (2, "two".to_string()), (3, "three".to_string())]
        );
    }

    #[tokio::test]
    async fn test_latest_follows_appends() {
        let (log, _, conversation) = setup().await;
        assert!(log.latest(&conversation.id).await.unwrap().is_none());

        log.append(&conversation.id, "alice", Some("one"), Vec::new()).await.unwrap();
        let second = log.append(&conversation.id, "bob", Some("two"), Vec::new()).await.unwrap();

        let latest = log.latest(&conversation.id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(latest.sequence, 2);
    }

    #[tokio::test]
    async fn test_reconcile_without_messages_is_a_no_op() {
        let (log, _, conversation) = setup().await;
        let reconciled = log.reconcile_last_message(&conversation.id).await.unwrap();
        assert_eq!(reconciled.last_message, None);
    }
}
