use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{
    DomainError, ItemKind, NewNotification, Notification, NotificationRepository, Result,
};

use super::db_error;

#[derive(FromRow)]
struct NotificationRow {
    id: i64,
    user_id: i64,
    title: String,
    message: String,
    #[sqlx(rename = "type")]
    kind: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            kind: row.kind.parse::<ItemKind>().map_err(DomainError::internal)?,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    /// One statement for the whole batch.
    async fn create_many(&self, notifications: Vec<NewNotification>) -> Result<()> {
        let mut user_ids = Vec::with_capacity(notifications.len());
        let mut titles = Vec::with_capacity(notifications.len());
        let mut messages = Vec::with_capacity(notifications.len());
        let mut kinds = Vec::with_capacity(notifications.len());
        for n in notifications {
            user_ids.push(n.user_id);
            titles.push(n.title);
            messages.push(n.message);
            kinds.push(n.kind.as_str().to_string());
        }

        sqlx::query(
            "
            INSERT INTO notifications (user_id, title, message, type)
            SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::TEXT[])
            ",
        )
        .bind(user_ids)
        .bind(titles)
        .bind(messages)
        .bind(kinds)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn list(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>> {
        sqlx::query_as::<_, NotificationRow>(
            "
            SELECT id, user_id, title, message, type, is_read, created_at
              FROM notifications
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Notification::try_from)
        .collect()
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }
}
