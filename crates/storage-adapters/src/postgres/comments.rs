use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{Comment, CommentRepository, DomainError, ItemKind, NewComment, Result};

use super::db_error;

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    content: String,
    user_id: i64,
    item_type: String,
    item_id: i64,
    created_at: DateTime<Utc>,
    first_name: String,
    last_name: String,
    email: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DomainError;

    fn try_from(row: CommentRow) -> Result<Self> {
        Ok(Comment {
            id: row.id,
            content: row.content,
            user_id: row.user_id,
            item_type: row.item_type.parse::<ItemKind>().map_err(DomainError::internal)?,
            item_id: row.item_id,
            created_at: row.created_at,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
        })
    }
}

pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO comments (content, user_id, item_type, item_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(comment.content)
        .bind(comment.user_id)
        .bind(comment.item_type.as_str())
        .bind(comment.item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn list(&self, kind: ItemKind, item_id: i64) -> Result<Vec<Comment>> {
        sqlx::query_as::<_, CommentRow>(
            "
            SELECT c.id, c.content, c.user_id, c.item_type, c.item_id, c.created_at,
                   u.first_name, u.last_name, u.email
              FROM comments c
              JOIN users u ON u.id = c.user_id
             WHERE c.item_type = $1 AND c.item_id = $2
             ORDER BY c.created_at DESC, c.id DESC
            ",
        )
        .bind(kind.as_str())
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?
        .into_iter()
        .map(Comment::try_from)
        .collect()
    }
}
