use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use domains::{Assignments, Audience, ItemKind, Result, Viewer, VisibilityRepository};

use super::{db_error, tables};

/// Inserts one grant row per audience id in each table. Callers own the transaction.
pub(crate) async fn write_grants(
    conn: &mut PgConnection,
    kind: ItemKind,
    item_id: i64,
    audience: &Audience,
) -> Result<()> {
    let t = tables(kind);
    let targets = [
        (t.department_grants, "department_id", audience.department_ids()),
        (t.user_grants, "user_id", audience.user_ids()),
    ];
    for (table, column, ids) in targets {
        if ids.is_empty() {
            continue;
        }
        let sql = format!(
            "INSERT INTO {table} ({key}, {column}) SELECT $1, g FROM UNNEST($2::BIGINT[]) AS g",
            key = t.key
        );
        sqlx::query(&sql)
            .bind(item_id)
            .bind(ids)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

/// Removes every grant of the item from both tables.
pub(crate) async fn clear_grants(conn: &mut PgConnection, kind: ItemKind, item_id: i64) -> Result<()> {
    let t = tables(kind);
    for table in [t.department_grants, t.user_grants] {
        sqlx::query(&format!("DELETE FROM {table} WHERE {key} = $1", key = t.key))
            .bind(item_id)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    Ok(())
}

/// SQL predicate on `alias.id` that holds when the viewer may see the item.
/// Binds: `$1` user id, `$2` is-admin flag, `$3` department ids.
pub(crate) fn visible_clause(kind: ItemKind, alias: &str) -> String {
    let t = tables(kind);
    format!(
        "($2 OR EXISTS (SELECT 1 FROM {dg} g WHERE g.{key} = {alias}.id AND g.department_id = ANY($3))
             OR EXISTS (SELECT 1 FROM {ug} g WHERE g.{key} = {alias}.id AND g.user_id = $1))",
        dg = t.department_grants,
        ug = t.user_grants,
        key = t.key,
    )
}

pub struct PgVisibilityRepository {
    pool: PgPool,
}

impl PgVisibilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisibilityRepository for PgVisibilityRepository {
    async fn grants(&self, kind: ItemKind, item_id: i64) -> Result<Assignments> {
        let t = tables(kind);
        let departments = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT department_id FROM {} WHERE {} = $1 ORDER BY department_id",
            t.department_grants, t.key
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let users = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT user_id FROM {} WHERE {} = $1 ORDER BY user_id",
            t.user_grants, t.key
        ))
        .bind(item_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(Assignments { departments, users })
    }

    async fn replace(&self, kind: ItemKind, item_id: i64, audience: Audience) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        clear_grants(&mut tx, kind, item_id).await?;
        write_grants(&mut tx, kind, item_id, &audience).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn visible_ids(&self, kind: ItemKind, viewer: &Viewer) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT i.id FROM {items} i WHERE {clause} ORDER BY i.id",
            items = tables(kind).items,
            clause = visible_clause(kind, "i"),
        );
        sqlx::query_scalar::<_, i64>(&sql)
            .bind(viewer.user_id)
            .bind(viewer.is_admin())
            .bind(&viewer.department_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }
}
