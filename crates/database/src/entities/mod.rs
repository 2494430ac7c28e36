//! Persisted records for the database layer

pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{direct_key, Conversation};
pub use message::{CreateAttachmentRequest, CreateMessageRequest, Message, MessageAttachment};
pub use user::{CreateUserRequest, User, UserStatus};
