//! Database repository implementations

pub mod conversation_repository;
pub mod message_repository;
pub mod user_repository;

pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;
pub use user_repository::UserRepository;

use crate::types::{DatabaseError, DatabaseResult};
use sqlx::{sqlite::SqliteRow, Row, Sqlite};

/// Typed column read that reports decode failures as query errors.
pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> DatabaseResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| DatabaseError::QueryError(e.to_string()))
}
