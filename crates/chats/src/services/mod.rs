//! Business logic layer for conversations and messages.

pub mod chat_service;
pub mod conversation_registry;
pub mod message_log;

pub use chat_service::ChatService;
pub use conversation_registry::ConversationRegistry;
pub use message_log::MessageLog;
