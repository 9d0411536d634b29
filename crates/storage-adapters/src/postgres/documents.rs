use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{
    Audience, Document, DocumentRepository, DocumentStats, DocumentView, DomainError, ItemKind,
    NewDocument, Result, StoredFile, Viewer,
};

use super::db_error;
use super::visibility::{visible_clause, write_grants};

const DOCUMENT_COLUMNS: &str = "d.id, d.title, d.description, d.file_path, d.file_name, d.public_url,
     d.file_size, d.mime_type, d.uploaded_by, d.created_at,
     u.first_name AS uploader_first_name, u.last_name AS uploader_last_name";

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    title: String,
    description: Option<String>,
    file_path: String,
    file_name: String,
    public_url: String,
    file_size: i64,
    mime_type: String,
    uploaded_by: i64,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            title: row.title,
            description: row.description,
            file: StoredFile {
                file_path: row.file_path,
                file_name: row.file_name,
                public_url: row.public_url,
                file_size: row.file_size,
                mime_type: row.mime_type,
            },
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ViewRow {
    #[sqlx(flatten)]
    document: DocumentRow,
    uploader_first_name: String,
    uploader_last_name: String,
    is_read: bool,
    is_downloaded: bool,
}

impl From<ViewRow> for DocumentView {
    fn from(row: ViewRow) -> Self {
        DocumentView {
            document: row.document.into(),
            uploader_first_name: row.uploader_first_name,
            uploader_last_name: row.uploader_last_name,
            is_read: row.is_read,
            is_downloaded: row.is_downloaded,
        }
    }
}

#[derive(FromRow)]
struct StatsRow {
    #[sqlx(flatten)]
    document: DocumentRow,
    uploader_first_name: String,
    uploader_last_name: String,
    read_count: i64,
    download_count: i64,
}

/// Per-viewer flags; `$1` is the viewer's user id.
fn flags() -> &'static str {
    "EXISTS (SELECT 1 FROM document_reads r WHERE r.document_id = d.id AND r.user_id = $1) AS is_read,
     EXISTS (SELECT 1 FROM document_downloads w WHERE w.document_id = d.id AND w.user_id = $1) AS is_downloaded"
}

pub struct PgDocumentRepository {
    pool: PgPool,
}

impl PgDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn list_all(&self) -> Result<Vec<DocumentStats>> {
        let sql = format!(
            "
            SELECT {DOCUMENT_COLUMNS},
                   (SELECT COUNT(*) FROM document_reads r WHERE r.document_id = d.id) AS read_count,
                   (SELECT COUNT(*) FROM document_downloads w WHERE w.document_id = d.id) AS download_count
              FROM documents d
              JOIN users u ON u.id = d.uploaded_by
             ORDER BY d.created_at DESC, d.id DESC
            "
        );
        let rows = sqlx::query_as::<_, StatsRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| DocumentStats {
                document: row.document.into(),
                uploader_first_name: row.uploader_first_name,
                uploader_last_name: row.uploader_last_name,
                read_count: row.read_count,
                download_count: row.download_count,
            })
            .collect())
    }

    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<DocumentView>> {
        let sql = format!(
            "
            SELECT {DOCUMENT_COLUMNS}, {flags}
              FROM documents d
              JOIN users u ON u.id = d.uploaded_by
             WHERE {clause}
             ORDER BY d.created_at DESC, d.id DESC
            ",
            flags = flags(),
            clause = visible_clause(ItemKind::Document, "d"),
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

    async fn find(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "
            SELECT d.id, d.title, d.description, d.file_path, d.file_name, d.public_url,
                   d.file_size, d.mime_type, d.uploaded_by, d.created_at
              FROM documents d
             WHERE d.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<DocumentView>> {
        let sql = format!(
            "
            SELECT {DOCUMENT_COLUMNS}, {flags}
              FROM documents d
              JOIN users u ON u.id = d.uploaded_by
             WHERE d.id = $2
            ",
            flags = flags(),
        );
        let row = sqlx::query_as::<_, ViewRow>(&sql)
            .bind(user_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, document: NewDocument, audience: Audience) -> Result<Document> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let row = sqlx::query_as::<_, DocumentRow>(
            "
            INSERT INTO documents
                (title, description, file_path, file_name, public_url, file_size, mime_type, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, description, file_path, file_name, public_url,
                      file_size, mime_type, uploaded_by, created_at
            ",
        )
        .bind(document.title)
        .bind(document.description)
        .bind(document.file.file_path)
        .bind(document.file.file_name)
        .bind(document.file.public_url)
        .bind(document.file.file_size)
        .bind(document.file.mime_type)
        .bind(document.uploaded_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        write_grants(&mut tx, ItemKind::Document, row.id, &audience).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(row.into())
    }

    async fn update(&self, id: i64, title: String, description: Option<String>) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET title = $1, description = $2 WHERE id = $3")
            .bind(title)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("document", id));
        }
        Ok(())
    }

    /// Grants and logs cascade; comments are removed in the same transaction.
    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("DELETE FROM comments WHERE item_type = 'document' AND item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("document", id));
        }
        tx.commit().await.map_err(db_error)
    }
}
