//! Shared types for the chat system.

pub mod errors;
pub mod responses;

pub use errors::{ChatError, ChatResult, ErrorKind};
pub use responses::{ConversationView, MessageView};

pub type ConversationId = String;
pub type MessageId = String;
pub type UserId = String;
