use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{
    ActivityKind, ActivityRecord, ActivityRepository, AuditEntry, DomainError, ItemKind,
    LogCategory, Result,
};

use super::{db_error, tables};

/// Log table holding `event` for `kind`.
fn log_table(kind: ItemKind, event: ActivityKind) -> Result<&'static str> {
    match (kind, event) {
        (_, ActivityKind::Read) => Ok(tables(kind).reads),
        (ItemKind::Document, ActivityKind::Download) => Ok("document_downloads"),
        (ItemKind::Note, ActivityKind::Download) => {
            Err(DomainError::validation("notes cannot be downloaded"))
        }
    }
}

#[derive(FromRow)]
struct RecordRow {
    user_id: i64,
    first_name: String,
    last_name: String,
    email: String,
    departments: Vec<String>,
    occurred_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct EntryRow {
    occurred_at: DateTime<Utc>,
    item_id: i64,
    item_title: String,
    first_name: String,
    last_name: String,
    email: String,
}

pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn record(&self, kind: ItemKind, item_id: i64, user_id: i64, event: ActivityKind) -> Result<()> {
        let table = log_table(kind, event)?;
        let sql = format!("INSERT INTO {table} ({key}, user_id) VALUES ($1, $2)", key = tables(kind).key);
        sqlx::query(&sql)
            .bind(item_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn events(&self, kind: ItemKind, item_id: i64, event: ActivityKind) -> Result<Vec<ActivityRecord>> {
        let table = log_table(kind, event)?;
        let sql = format!(
            "
            SELECT u.id AS user_id, u.first_name, u.last_name, u.email,
                   ARRAY(SELECT dp.name
                           FROM user_departments ud
                           JOIN departments dp ON dp.id = ud.department_id
                          WHERE ud.user_id = u.id
                          ORDER BY dp.name) AS departments,
                   l.created_at AS occurred_at
              FROM {table} l
              JOIN users u ON u.id = l.user_id
             WHERE l.{key} = $1
             ORDER BY l.created_at DESC, l.id DESC
            ",
            key = tables(kind).key,
        );
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(item_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ActivityRecord {
                user_id: row.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
                departments: row.departments,
                timestamp: row.occurred_at,
            })
            .collect())
    }

    async fn recent(&self, category: LogCategory, limit: i64) -> Result<Vec<AuditEntry>> {
        let kind = category.item_kind();
        let t = tables(kind);
        let sql = format!(
            "
            SELECT l.created_at AS occurred_at, i.id AS item_id, i.title AS item_title,
                   u.first_name, u.last_name, u.email
              FROM {log} l
              JOIN {items} i ON i.id = l.{key}
              JOIN users u ON u.id = l.user_id
             ORDER BY l.created_at DESC, l.id DESC
             LIMIT $1
            ",
            log = log_table(kind, category.activity())?,
            items = t.items,
            key = t.key,
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| AuditEntry {
                category,
                timestamp: row.occurred_at,
                item_id: row.item_id,
                item_title: row.item_title,
                first_name: row.first_name,
                last_name: row.last_name,
                email: row.email,
            })
            .collect())
    }
}
