//! Domain entities for conversations and messages.

pub mod attachment;
pub mod conversation;
pub mod message;
pub mod user;

pub use attachment::{infer_media_type, AttachmentRef, RawAttachment};
pub use conversation::Conversation;
pub use message::{Message, NewMessage};
pub use user::{UserProfile, UserStatus};
