use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{
    Audience, DomainError, ItemKind, NewNote, Note, NoteRepository, NoteStats, NoteView, Result,
    Viewer,
};

use super::db_error;
use super::visibility::{clear_grants, visible_clause, write_grants};

const NOTE_COLUMNS: &str = "n.id, n.title, n.content, n.created_by, n.created_at,
     u.first_name AS author_first_name, u.last_name AS author_last_name";

#[derive(FromRow)]
struct NoteRow {
    id: i64,
    title: String,
    content: String,
    created_by: i64,
    created_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Note {
            id: row.id,
            title: row.title,
            content: row.content,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ViewRow {
    #[sqlx(flatten)]
    note: NoteRow,
    author_first_name: String,
    author_last_name: String,
    is_read: bool,
}

impl From<ViewRow> for NoteView {
    fn from(row: ViewRow) -> Self {
        NoteView {
            note: row.note.into(),
            author_first_name: row.author_first_name,
            author_last_name: row.author_last_name,
            is_read: row.is_read,
        }
    }
}

#[derive(FromRow)]
struct StatsRow {
    #[sqlx(flatten)]
    note: NoteRow,
    author_first_name: String,
    author_last_name: String,
    read_count: i64,
}

const IS_READ: &str =
    "EXISTS (SELECT 1 FROM note_reads r WHERE r.note_id = n.id AND r.user_id = $1) AS is_read";

pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list_all(&self) -> Result<Vec<NoteStats>> {
        let sql = format!(
            "
            SELECT {NOTE_COLUMNS},
                   (SELECT COUNT(*) FROM note_reads r WHERE r.note_id = n.id) AS read_count
              FROM notes n
              JOIN users u ON u.id = n.created_by
             ORDER BY n.created_at DESC, n.id DESC
            "
        );
        let rows = sqlx::query_as::<_, StatsRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| NoteStats {
                note: row.note.into(),
                author_first_name: row.author_first_name,
                author_last_name: row.author_last_name,
                read_count: row.read_count,
            })
            .collect())
    }

    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<NoteView>> {
        let sql = format!(
            "
            SELECT {NOTE_COLUMNS}, {IS_READ}
              FROM notes n
              JOIN users u ON u.id = n.created_by
             WHERE {clause}
             ORDER BY n.created_at DESC, n.id DESC
            ",
            clause = visible_clause(ItemKind::Note, "n"),
        );
        let rows = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(viewer.user_id)
            .bind(viewer.is_admin())
            .bind(&viewer.department_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(
            "SELECT id, title, content, created_by, created_at FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<NoteView>> {
        let sql = format!(
            "
            SELECT {NOTE_COLUMNS}, {IS_READ}
              FROM notes n
              JOIN users u ON u.id = n.created_by
             WHERE n.id = $2
            "
        );
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, note: NewNote, audience: Audience) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, NoteRow>(
            "
            INSERT INTO notes (title, content, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, created_by, created_at
            ",
        )
        .bind(note.title)
        .bind(note.content)
        .bind(note.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        write_grants(&mut tx, ItemKind::Note, row.id, &audience).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, title: String, content: String, audience: Option<Audience>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query("UPDATE notes SET title = $1, content = $2 WHERE id = $3")
            .bind(title)
            .bind(content)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("note", id));
        }

        if let Some(audience) = audience {
            clear_grants(&mut tx, ItemKind::Note, id).await?;
            write_grants(&mut tx, ItemKind::Note, id, &audience).await?;
        }
        tx.commit().await.map_err(db_error)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("DELETE FROM comments WHERE item_type = 'note' AND item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("note", id));
        }
        tx.commit().await.map_err(db_error)
    }
}
