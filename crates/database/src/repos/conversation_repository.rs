//! Repository for conversation and participant data access.

use crate::entities::{direct_key, Conversation};
use crate::repos::column;
use crate::types::{format_timestamp, parse_timestamp, DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, SqlitePool};
use tracing::{debug, info};

const CONVERSATION_COLUMNS: &str = "c.id AS id, c.is_group AS is_group, c.group_name AS group_name, \
     c.created_by AS created_by, c.last_message_id AS last_message_id, \
     c.created_at AS created_at, c.updated_at AS updated_at";

/// Repository for conversation database operations
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Find the direct conversation between two users, in either order.
    pub async fn find_direct(&self, user_a: &str, user_b: &str) -> DatabaseResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.direct_key = ?");
        let row = sqlx::query(&sql)
            .bind(direct_key(user_a, user_b))
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Conversations the user participates in, most recently updated first.
    pub async fn list_for_user(&self, user_id: &str) -> DatabaseResult<Vec<Conversation>> {
        let sql = format!(
            r#"
            SELECT {CONVERSATION_COLUMNS}
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = ?
            ORDER BY c.updated_at DESC, c.id DESC
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            conversations.push(self.hydrate(row).await?);
        }
        Ok(conversations)
    }

    /// Every conversation, oldest first.
    pub async fn list_all(&self) -> DatabaseResult<Vec<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c ORDER BY c.created_at ASC, c.id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            conversations.push(self.hydrate(row).await?);
        }
        Ok(conversations)
    }

    /// Insert a conversation together with its participants.
    ///
    /// Direct conversations carry a unique pair key; a second direct
    /// conversation for the same pair fails with [`DatabaseError::Duplicate`].
    pub async fn insert(&self, conversation: &Conversation) -> DatabaseResult<()> {
        let pair_key = if conversation.is_group {
            None
        } else {
            match conversation.participants.as_slice() {
                [a, b] => Some(direct_key(a, b)),
                _ => {
                    return Err(DatabaseError::InternalError(
                        "direct conversation requires exactly two participants".to_string(),
                    ))
                }
            }
        };

        let created_at = format_timestamp(&conversation.created_at);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_query)?;

        sqlx::query(
            "INSERT INTO conversations (id, is_group, group_name, created_by, direct_key, last_message_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(conversation.is_group)
        .bind(&conversation.group_name)
        .bind(&conversation.created_by)
        .bind(&pair_key)
        .bind(&conversation.last_message_id)
        .bind(&created_at)
        .bind(format_timestamp(&conversation.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        for (position, user_id) in conversation.participants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id, position, joined_at) VALUES (?, ?, ?, ?)",
            )
            .bind(&conversation.id)
            .bind(user_id)
            .bind(position as i64)
            .bind(&created_at)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        }

        tx.commit().await.map_err(DatabaseError::from_query)?;

        info!(
            conversation_id = %conversation.id,
            is_group = conversation.is_group,
            participants = conversation.participants.len(),
            "created conversation"
        );
        Ok(())
    }

    /// Append participants that are not already members and bump `updated_at`.
    /// Returns `None` when the conversation does not exist.
    pub async fn add_participants(
        &self,
        id: &str,
        user_ids: &[String],
        at: DateTime<Utc>,
    ) -> DatabaseResult<Option<Conversation>> {
        let stamp = format_timestamp(&at);
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_query)?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&stamp)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?
            .rows_affected();

        if touched == 0 {
            tx.rollback().await.map_err(DatabaseError::from_query)?;
            return Ok(None);
        }

        let mut position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM conversation_participants WHERE conversation_id = ?",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        let mut added = 0usize;
        for user_id in user_ids {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id, position, joined_at) VALUES (?, ?, ?, ?)",
            )
            .bind(id)
            .bind(user_id)
            .bind(position)
            .bind(&stamp)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?
            .rows_affected();

            if inserted > 0 {
                position += 1;
                added += 1;
            }
        }

        tx.commit().await.map_err(DatabaseError::from_query)?;
        info!(conversation_id = %id, added, "added conversation participants");

        self.find_by_id(id).await
    }

    /// Remove one participant and bump `updated_at`.
    /// Returns `None` when the conversation does not exist.
    pub async fn remove_participant(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<Option<Conversation>> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_query)?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(format_timestamp(&at))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?
            .rows_affected();

        if touched == 0 {
            tx.rollback().await.map_err(DatabaseError::from_query)?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM conversation_participants WHERE conversation_id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;

        tx.commit().await.map_err(DatabaseError::from_query)?;
        info!(conversation_id = %id, user_id = %user_id, "removed conversation participant");

        self.find_by_id(id).await
    }

    /// Point `last_message_id` at a message unless the current pointer already
    /// references a later one. Returns whether the pointer moved.
    pub async fn set_last_message(
        &self,
        id: &str,
        message_id: &str,
        seq: i64,
        at: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let moved = sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_id = ?, updated_at = MAX(updated_at, ?)
            WHERE id = ?
              AND (
                last_message_id IS NULL
                OR COALESCE((SELECT m.seq FROM messages m WHERE m.id = conversations.last_message_id), 0) < ?
              )
            "#,
        )
        .bind(message_id)
        .bind(format_timestamp(&at))
        .bind(id)
        .bind(seq)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?
        .rows_affected()
            > 0;

        if !moved {
            debug!(conversation_id = %id, message_id = %message_id, "last message pointer already ahead");
        }
        Ok(moved)
    }

    /// Delete every conversation. Participants and messages cascade.
    pub async fn delete_all(&self) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;
        Ok(result.rows_affected())
    }

    async fn hydrate(&self, row: &SqliteRow) -> DatabaseResult<Conversation> {
        let id: String = column(row, "id")?;
        let participants = self.load_participants(&id).await?;
        let created_at: String = column(row, "created_at")?;
        let updated_at: String = column(row, "updated_at")?;

        Ok(Conversation {
            participants,
            is_group: column(row, "is_group")?,
            group_name: column(row, "group_name")?,
            created_by: column(row, "created_by")?,
            last_message_id: column(row, "last_message_id")?,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            id,
        })
    }

    async fn load_participants(&self, conversation_id: &str) -> DatabaseResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT user_id FROM conversation_participants WHERE conversation_id = ? ORDER BY position ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)
    }
}
