//! # Parley Chats Crate
//!
//! Core domain logic for direct and group conversations.
//!
//! ## Architecture
//!
//! - **Entities**: Conversation, Message, attachment references, user profiles
//! - **Repositories**: Store traits plus SQLite, in-memory and filesystem implementations
//! - **Services**: `ConversationRegistry`, `MessageLog` and the `ChatService` facade
//! - **Types**: Errors, identifiers and hydrated response views
//! - **Utils**: Validation and permission checks
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use parley_chats::repositories::{
//!     MemoryAttachmentStore, MemoryConversationStore, MemoryIdentityStore, MemoryMessageStore,
//! };
//! use parley_chats::ChatService;
//!
//! # async fn demo() -> parley_chats::ChatResult<()> {
//! let service = ChatService::new(
//!     Arc::new(MemoryConversationStore::new()),
//!     Arc::new(MemoryMessageStore::new()),
//!     Arc::new(MemoryIdentityStore::new()),
//!     Arc::new(MemoryAttachmentStore::new()),
//! );
//! let conversations = service.get_conversations_for_caller("user-id").await?;
//! # let _ = conversations;
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod repositories;
pub mod services;
pub mod types;
pub mod utils;

pub use entities::{AttachmentRef, Conversation, Message, NewMessage, RawAttachment, UserProfile, UserStatus};
pub use repositories::{AttachmentStore, ConversationStore, IdentityStore, MessageStore};
pub use services::{ChatService, ConversationRegistry, MessageLog};
pub use types::{ChatError, ChatResult, ConversationView, ErrorKind, MessageView};
