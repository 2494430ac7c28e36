//! Repository for message data access operations.

use std::collections::HashMap;

use crate::entities::{CreateMessageRequest, Message, MessageAttachment};
use crate::repos::column;
use crate::types::{format_timestamp, parse_timestamp, DatabaseError, DatabaseResult};
use sqlx::{sqlite::SqliteRow, SqlitePool};
use tracing::{info, warn};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, seq, created_at";

/// Attempts made when a concurrent writer claims the same sequence number.
const MAX_SEQUENCE_ATTEMPTS: usize = 3;

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a message and its attachments, assigning the next sequence
    /// number of its conversation.
    pub async fn create(&self, request: &CreateMessageRequest) -> DatabaseResult<Message> {
        let mut attempt = 1;
        loop {
            match self.try_create(request).await {
                Err(DatabaseError::Duplicate(reason)) if attempt < MAX_SEQUENCE_ATTEMPTS => {
                    warn!(
                        conversation_id = %request.conversation_id,
                        attempt,
                        %reason,
                        "message sequence contended, retrying"
                    );
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    async fn try_create(&self, request: &CreateMessageRequest) -> DatabaseResult<Message> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_query)?;

        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, seq, created_at)
            SELECT ?, ?, ?, ?, COALESCE(MAX(seq), 0) + 1, ?
            FROM messages WHERE conversation_id = ?
            RETURNING seq
            "#,
        )
        .bind(&request.id)
        .bind(&request.conversation_id)
        .bind(&request.sender_id)
        .bind(&request.content)
        .bind(format_timestamp(&request.created_at))
        .bind(&request.conversation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        for (position, attachment) in request.attachments.iter().enumerate() {
            sqlx::query(
                "INSERT INTO message_attachments (message_id, position, url, name, media_type) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&request.id)
            .bind(position as i64)
            .bind(&attachment.url)
            .bind(&attachment.name)
            .bind(&attachment.media_type)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::from_query)?;
        }

        tx.commit().await.map_err(DatabaseError::from_query)?;

        info!(
            message_id = %request.id,
            conversation_id = %request.conversation_id,
            sender_id = %request.sender_id,
            seq,
            attachments = request.attachments.len(),
            "created new message"
        );

        Ok(Message {
            id: request.id.clone(),
            conversation_id: request.conversation_id.clone(),
            sender_id: request.sender_id.clone(),
            content: request.content.clone(),
            attachments: request.attachments.iter().cloned().map(Into::into).collect(),
            seq,
            created_at: request.created_at,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attachments = self.load_attachments(id).await?;
        Ok(Some(message_from_row(&row, attachments)?))
    }

    /// Full history of a conversation in sequence order.
    pub async fn list_for_conversation(&self, conversation_id: &str) -> DatabaseResult<Vec<Message>> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        let mut attachments = self.load_conversation_attachments(conversation_id).await?;

        rows.iter()
            .map(|row| {
                let id: String = column(row, "id")?;
                let attached = attachments.remove(&id).unwrap_or_default();
                message_from_row(row, attached)
            })
            .collect()
    }

    pub async fn latest_for_conversation(&self, conversation_id: &str) -> DatabaseResult<Option<Message>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? ORDER BY seq DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = column(&row, "id")?;
        let attachments = self.load_attachments(&id).await?;
        Ok(Some(message_from_row(&row, attachments)?))
    }

    async fn load_attachments(&self, message_id: &str) -> DatabaseResult<Vec<MessageAttachment>> {
        let rows = sqlx::query(
            "SELECT url, name, media_type FROM message_attachments WHERE message_id = ? ORDER BY position ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        rows.iter().map(attachment_from_row).collect()
    }

    async fn load_conversation_attachments(
        &self,
        conversation_id: &str,
    ) -> DatabaseResult<HashMap<String, Vec<MessageAttachment>>> {
        let rows = sqlx::query(
            r#"
            SELECT a.message_id AS message_id, a.url AS url, a.name AS name, a.media_type AS media_type
            FROM message_attachments a
            JOIN messages m ON m.id = a.message_id
            WHERE m.conversation_id = ?
            ORDER BY a.message_id ASC, a.position ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        let mut grouped: HashMap<String, Vec<MessageAttachment>> = HashMap::new();
        for row in &rows {
            let message_id: String = column(row, "message_id")?;
            grouped
                .entry(message_id)
                .or_default()
                .push(attachment_from_row(row)?);
        }
        Ok(grouped)
    }
}

fn message_from_row(row: &SqliteRow, attachments: Vec<MessageAttachment>) -> DatabaseResult<Message> {
    let created_at: String = column(row, "created_at")?;

    Ok(Message {
        id: column(row, "id")?,
        conversation_id: column(row, "conversation_id")?,
        sender_id: column(row, "sender_id")?,
        content: column(row, "content")?,
        attachments,
        seq: column(row, "seq")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn attachment_from_row(row: &SqliteRow) -> DatabaseResult<MessageAttachment> {
    Ok(MessageAttachment {
        url: column(row, "url")?,
        name: column(row, "name")?,
        media_type: column(row, "media_type")?,
    })
}
