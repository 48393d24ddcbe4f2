//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `storefront-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, writes on the single
//! writer connection.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use storefront_core::chat::repository::ChatRepository;
use storefront_types::chat::{ChatMessage, ChatRoom, RoomStatus};
use storefront_types::error::RepositoryError;
use storefront_types::principal::Role;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRoomRow {
    id: i64,
    customer_id: i64,
    subject: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
    last_message_at: Option<String>,
}

impl ChatRoomRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            subject: row.try_get("subject")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_message_at: row.try_get("last_message_at")?,
        })
    }

    fn into_room(self) -> Result<ChatRoom, RepositoryError> {
        let status: RoomStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatRoom {
            id: self.id,
            customer_id: self.customer_id,
            subject: self.subject,
            status,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
            last_message_at: self
                .last_message_at
                .as_deref()
                .map(parse_datetime)
                .transpose()?,
        })
    }
}

struct ChatMessageRow {
    id: i64,
    room_id: i64,
    sender_id: i64,
    sender_role: String,
    content: String,
    created_at: String,
    read_at: Option<String>,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            room_id: row.try_get("room_id")?,
            sender_id: row.try_get("sender_id")?,
            sender_role: row.try_get("sender_role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            read_at: row.try_get("read_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let sender_role: Role = self
            .sender_role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id: self.id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            sender_role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            read_at: self.read_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn map_rooms(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<ChatRoom>, RepositoryError> {
    rows.iter()
        .map(|row| ChatRoomRow::from_row(row).map_err(query_err)?.into_room())
        .collect()
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn find_or_create_open_room(
        &self,
        customer_id: i64,
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(ChatRoom, bool), RepositoryError> {
        // The writer pool holds one connection, so this transaction serializes
        // with every other open-room call.
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let existing = sqlx::query(
            "SELECT * FROM chat_rooms WHERE customer_id = ? AND status = 'open' ORDER BY id DESC LIMIT 1",
        )
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(query_err)?;

        if let Some(row) = existing {
            let room = ChatRoomRow::from_row(&row).map_err(query_err)?.into_room()?;
            tx.commit().await.map_err(query_err)?;
            return Ok((room, false));
        }

        let result = sqlx::query(
            r#"INSERT INTO chat_rooms (customer_id, subject, status, created_at, updated_at)
               VALUES (?, ?, 'open', ?, ?)"#,
        )
        .bind(customer_id)
        .bind(subject)
        .bind(format_datetime(&now))
        .bind(format_datetime(&now))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        let room = ChatRoom {
            id: result.last_insert_rowid(),
            customer_id,
            subject: subject.map(str::to_string),
            status: RoomStatus::Open,
            created_at: now,
            updated_at: now,
            last_message_at: None,
        };
        Ok((room, true))
    }

    async fn get_room(&self, room_id: i64) -> Result<Option<ChatRoom>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_rooms WHERE id = ?")
            .bind(room_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        row.map(|row| ChatRoomRow::from_row(&row).map_err(query_err)?.into_room())
            .transpose()
    }

    async fn list_rooms(&self, customer_id: Option<i64>) -> Result<Vec<ChatRoom>, RepositoryError> {
        let mut sql = String::from("SELECT * FROM chat_rooms");
        if customer_id.is_some() {
            sql.push_str(" WHERE customer_id = ?");
        }
        sql.push_str(" ORDER BY COALESCE(last_message_at, updated_at) DESC, id DESC");

        let mut query = sqlx::query(&sql);
        if let Some(customer_id) = customer_id {
            query = query.bind(customer_id);
        }
        let rows = query
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        map_rooms(&rows)
    }

    async fn update_room_status(
        &self,
        room_id: i64,
        status: RoomStatus,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE chat_rooms SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(format_datetime(&now))
            .bind(room_id)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn save_message(
        &self,
        room_id: i64,
        sender_id: i64,
        sender_role: Role,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        let result = sqlx::query(
            r#"INSERT INTO chat_messages (room_id, sender_id, sender_role, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(sender_role.to_string())
        .bind(content)
        .bind(format_datetime(&now))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        let id = result.last_insert_rowid();

        sqlx::query("UPDATE chat_rooms SET last_message_at = ?, updated_at = ? WHERE id = ?")
            .bind(format_datetime(&now))
            .bind(format_datetime(&now))
            .bind(room_id)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;

        Ok(ChatMessage {
            id,
            room_id,
            sender_id,
            sender_role,
            content: content.to_string(),
            created_at: now,
            read_at: None,
        })
    }

    async fn get_messages(
        &self,
        room_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut sql =
            String::from("SELECT * FROM chat_messages WHERE room_id = ? ORDER BY created_at ASC, id ASC");

        // SQLite requires LIMIT before OFFSET; -1 means unbounded.
        if limit.is_some() || offset.is_some() {
            sql.push_str(&format!(" LIMIT {}", limit.unwrap_or(-1)));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let rows = sqlx::query(&sql)
            .bind(room_id)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        rows.iter()
            .map(|row| ChatMessageRow::from_row(row).map_err(query_err)?.into_message())
            .collect()
    }

    async fn last_message(&self, room_id: i64) -> Result<Option<ChatMessage>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM chat_messages WHERE room_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(query_err)?;

        row.map(|row| ChatMessageRow::from_row(&row).map_err(query_err)?.into_message())
            .transpose()
    }

    async fn count_unread(&self, room_id: i64, reader_role: Role) -> Result<u64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM chat_messages WHERE room_id = ? AND sender_role != ? AND read_at IS NULL",
        )
        .bind(room_id)
        .bind(reader_role.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let count: i64 = row.try_get("count").map_err(query_err)?;
        Ok(count as u64)
    }

    async fn mark_read(
        &self,
        room_id: i64,
        reader_role: Role,
        now: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE chat_messages SET read_at = ? WHERE room_id = ? AND sender_role != ? AND read_at IS NULL",
        )
        .bind(format_datetime(&now))
        .bind(room_id)
        .bind(reader_role.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(result.rows_affected())
    }
}
