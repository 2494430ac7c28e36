//! Parley Database Crate
//!
//! SQLite persistence for the Parley chat backend: connection management,
//! embedded migrations, and repositories for users, conversations and
//! messages.

use parley_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{ConversationRepository, MessageRepository, UserRepository};

pub use entities::{
    conversation::{direct_key, Conversation},
    message::{CreateAttachmentRequest, CreateMessageRequest, Message, MessageAttachment},
    user::{CreateUserRequest, User, UserStatus},
};

pub use types::{errors::DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
