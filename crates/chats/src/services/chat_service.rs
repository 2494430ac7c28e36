//! Public entry point combining the registry, the message log and the
//! identity and attachment collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::warn;

use crate::entities::{AttachmentRef, Conversation, Message, RawAttachment, UserProfile};
use crate::repositories::{AttachmentStore, ConversationStore, IdentityStore, MessageStore};
use crate::services::{ConversationRegistry, MessageLog};
use crate::types::{ChatError, ChatResult, ConversationView, MessageView, UserId};
use crate::utils::{PermissionChecker, Validator};

#[derive(Clone)]
pub struct ChatService {
    registry: ConversationRegistry,
    log: MessageLog,
    identities: Arc<dyn IdentityStore>,
    attachments: Arc<dyn AttachmentStore>,
}

impl ChatService {
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        identities: Arc<dyn IdentityStore>,
        attachments: Arc<dyn AttachmentStore>,
    ) -> Self {
        let registry = ConversationRegistry::new(conversations);
        let log = MessageLog::new(messages, registry.clone());
        Self {
            registry,
            log,
            identities,
            attachments,
        }
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub fn message_log(&self) -> &MessageLog {
        &self.log
    }

    /// Every conversation of `user_id`, newest activity first, with
    /// participants and last message resolved.
    pub async fn get_conversations_for_caller(&self, user_id: &str) -> ChatResult<Vec<ConversationView>> {
        let conversations = self.registry.list_for_user(user_id).await?;
        Ok(self.populate_conversations(conversations).await)
    }

    pub async fn create_direct_conversation(
        &self,
        caller: &str,
        other_username: &str,
    ) -> ChatResult<ConversationView> {
        let other = self.resolve_username(other_username).await?;
        let conversation = self.registry.find_or_create_direct(caller, &other.id).await?;
        Ok(self.populate_conversation(conversation).await)
    }

    pub async fn create_group_conversation(
        &self,
        caller: &str,
        group_name: &str,
        participant_usernames: &[String],
    ) -> ChatResult<ConversationView> {
        Validator::group_name(group_name)?;

        let member_ids = self.resolve_usernames(participant_usernames).await?;
        let conversation = self
            .registry
            .create_group(caller, &member_ids, group_name)
            .await?;
        Ok(self.populate_conversation(conversation).await)
    }

    pub async fn add_group_participants(
        &self,
        conversation_id: &str,
        caller: &str,
        usernames: &[String],
    ) -> ChatResult<ConversationView> {
        let user_ids = self.resolve_usernames(usernames).await?;
        let conversation = self
            .registry
            .add_participants(conversation_id, caller, &user_ids)
            .await?;
        Ok(self.populate_conversation(conversation).await)
    }

    pub async fn remove_group_participant(
        &self,
        conversation_id: &str,
        caller: &str,
        username: &str,
    ) -> ChatResult<ConversationView> {
        let target = self.resolve_username(username).await?;
        let conversation = self
            .registry
            .remove_participant(conversation_id, caller, &target.id)
            .await?;
        Ok(self.populate_conversation(conversation).await)
    }

    /// Upload `attachments`, append the message and return it with its
    /// sender resolved. Nothing is uploaded for an empty payload, and blobs
    /// already uploaded are discarded if the post fails.
    pub async fn post_message(
        &self,
        conversation_id: &str,
        sender: &str,
        content: Option<&str>,
        attachments: Vec<RawAttachment>,
    ) -> ChatResult<MessageView> {
        let conversation = self.registry.get(conversation_id).await?;
        PermissionChecker::ensure_participant(&conversation, sender)?;

        let content = Validator::message_content(content)?;
        Validator::message_payload(content.as_deref(), attachments.len())?;

        let stored = self.upload_all(attachments).await?;

        let message = match self
            .log
            .append(conversation_id, sender, content.as_deref(), stored.clone())
            .await
        {
            Ok(message) => message,
            Err(error) => {
                self.discard_uploads(&stored).await;
                return Err(error);
            }
        };

        let profile = match self.identities.find_by_id(sender).await {
            Ok(profile) => profile,
            Err(error) => {
                warn!(message_id = %message.id, sender, %error, "failed to resolve message sender");
                None
            }
        };
        Ok(MessageView::new(message, profile))
    }

    /// Full history of a conversation with every sender resolved.
    pub async fn get_messages(&self, conversation_id: &str) -> ChatResult<Vec<MessageView>> {
        self.registry.get(conversation_id).await?;

        let messages = self.log.list_for_conversation(conversation_id).await?;
        let senders = unique(messages.iter().map(|m| m.sender.as_str()));
        let profiles = self.profiles(&senders).await;

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender = profiles.get(&message.sender).cloned();
                MessageView::new(message, sender)
            })
            .collect())
    }

    /// Repair a conversation whose last-message pointer lags behind its log.
    pub async fn reconcile_last_message(&self, conversation_id: &str) -> ChatResult<ConversationView> {
        let conversation = self.log.reconcile_last_message(conversation_id).await?;
        Ok(self.populate_conversation(conversation).await)
    }

    async fn resolve_username(&self, username: &str) -> ChatResult<UserProfile> {
        self.identities
            .find_by_username(username)
            .await?
            .ok_or_else(|| ChatError::user_not_found(username))
    }

    /// Resolve usernames in order, failing on the first unknown one.
    async fn resolve_usernames(&self, usernames: &[String]) -> ChatResult<Vec<UserId>> {
        let mut ids = Vec::with_capacity(usernames.len());
        for username in usernames {
            ids.push(self.resolve_username(username).await?.id);
        }
        Ok(ids)
    }

    /// Upload one attachment at a time. On failure the blobs stored so far
    /// are discarded.
    async fn upload_all(&self, attachments: Vec<RawAttachment>) -> ChatResult<Vec<AttachmentRef>> {
        let mut stored = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            match self.attachments.store(attachment).await {
                Ok(reference) => stored.push(reference),
                Err(error) => {
                    self.discard_uploads(&stored).await;
                    return Err(error);
                }
            }
        }
        Ok(stored)
    }

    async fn discard_uploads(&self, stored: &[AttachmentRef]) {
        for attachment in stored {
            if let Err(error) = self.attachments.remove(attachment).await {
                warn!(url = %attachment.url, %error, "failed to discard orphaned attachment");
            }
        }
    }

    /// Display profiles keyed by id. Lookup failures degrade to an empty map.
    async fn profiles(&self, ids: &[UserId]) -> HashMap<UserId, UserProfile> {
        if ids.is_empty() {
            return HashMap::new();
        }

        match self.identities.find_by_ids(ids).await {
            Ok(profiles) => profiles
                .into_iter()
                .map(|profile| (profile.id.clone(), profile))
                .collect(),
            Err(error) => {
                warn!(users = ids.len(), %error, "failed to resolve user profiles");
                HashMap::new()
            }
        }
    }

    async fn populate_conversation(&self, conversation: Conversation) -> ConversationView {
        let last_message = self.last_message_of(&conversation).await;
        let user_ids = unique(
            conversation
                .participants
                .iter()
                .map(String::as_str)
                .chain(last_message.iter().map(|m| m.sender.as_str())),
        );
        let profiles = self.profiles(&user_ids).await;
        view(conversation, last_message, &profiles)
    }

    async fn populate_conversations(&self, conversations: Vec<Conversation>) -> Vec<ConversationView> {
        let last_messages: Vec<Option<Message>> =
            join_all(conversations.iter().map(|c| self.last_message_of(c))).await;

        let user_ids = unique(
            conversations
                .iter()
                .flat_map(|c| c.participants.iter().map(String::as_str))
                .chain(last_messages.iter().flatten().map(|m| m.sender.as_str())),
        );
        let profiles = self.profiles(&user_ids).await;

        conversations
            .into_iter()
            .zip(last_messages)
            .map(|(conversation, last_message)| view(conversation, last_message, &profiles))
            .collect()
    }

    /// The message the pointer references, or `None` when it is unset,
    /// missing or cannot be loaded.
    async fn last_message_of(&self, conversation: &Conversation) -> Option<Message> {
        let message_id = conversation.last_message.as_deref()?;

        match self.log.get(message_id).await {
            Ok(Some(message)) => Some(message),
            Ok(None) => {
                warn!(
                    conversation_id = %conversation.id,
                    message_id,
                    "last message pointer references a missing message"
                );
                None
            }
            Err(error) => {
                warn!(
                    conversation_id = %conversation.id,
                    message_id,
                    %error,
                    "failed to load last message"
                );
                None
            }
        }
    }
}

fn view(
    conversation: Conversation,
    last_message: Option<Message>,
    profiles: &HashMap<UserId, UserProfile>,
) -> ConversationView {
    let participants = conversation
        .participants
        .iter()
        .map(|id| profiles.get(id).cloned())
        .collect();
    let last_message = last_message.map(|message| {
        let sender = profiles.get(&message.sender).cloned();
        MessageView::new(message, sender)
    });
    ConversationView::new(conversation, participants, last_message)
}

fn unique<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
