//! User repository for database operations.

use crate::entities::{CreateUserRequest, User, UserStatus};
use crate::repos::column;
use crate::types::{format_timestamp, parse_timestamp, DatabaseError, DatabaseResult};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, username, email, profile_picture, status, created_at";

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Find user by exact username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        row.as_ref().map(user_from_row).transpose()
    }

    /// Fetch every user whose id is in `ids`. Unknown ids are skipped.
    pub async fn find_by_ids(&self, ids: &[String]) -> DatabaseResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id IN ({placeholders})");

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        rows.iter().map(user_from_row).collect()
    }

    /// List all users, oldest first
    pub async fn list(&self) -> DatabaseResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?;

        rows.iter().map(user_from_row).collect()
    }

    /// Create new user. Username and email must both be unused.
    pub async fn create(&self, request: &CreateUserRequest) -> DatabaseResult<User> {
        let user = User {
            id: cuid2::create_id(),
            username: request.username.clone(),
            email: request.email.clone(),
            profile_picture: request.profile_picture.clone(),
            status: UserStatus::default(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, profile_picture, status, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.profile_picture)
        .bind(user.status.as_str())
        .bind(format_timestamp(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        info!(user_id = %user.id, username = %user.username, "created user");
        Ok(user)
    }
}

fn user_from_row(row: &SqliteRow) -> DatabaseResult<User> {
    let status: String = column(row, "status")?;
    let created_at: String = column(row, "created_at")?;

    Ok(User {
        id: column(row, "id")?,
        username: column(row, "username")?,
        email: column(row, "email")?,
        profile_picture: column(row, "profile_picture")?,
        status: UserStatus::from(status.as_str()),
        created_at: parse_timestamp(&created_at)?,
    })
}
