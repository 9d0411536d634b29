use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use domains::{
    Department, DepartmentRepository, DepartmentSummary, DomainError, NewDepartment, Result,
};

use super::db_error;

#[derive(FromRow)]
pub(crate) struct DepartmentRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    department: DepartmentRow,
    user_count: i64,
}

pub struct PgDepartmentRepository {
    pool: PgPool,
}

impl PgDepartmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DepartmentRepository for PgDepartmentRepository {
    async fn list(&self) -> Result<Vec<DepartmentSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            "
            SELECT d.id, d.name, d.description, d.created_at,
                   (SELECT COUNT(*)
                      FROM user_departments ud
                      JOIN users u ON u.id = ud.user_id
                     WHERE ud.department_id = d.id AND u.is_active) AS user_count
              FROM departments d
             ORDER BY d.name
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows
            .into_iter()
            .map(|row| DepartmentSummary { department: row.department.into(), user_count: row.user_count })
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Department>> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "SELECT id, name, description, created_at FROM departments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.map(Into::into))
    }

    async fn create(&self, department: NewDepartment) -> Result<Department> {
        let row = sqlx::query_as::<_, DepartmentRow>(
            "
            INSERT INTO departments (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at
            ",
        )
        .bind(department.name)
        .bind(department.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(row.into())
    }

    async fn rename(&self, id: i64, name: String, description: Option<String>) -> Result<()> {
        let result = sqlx::query("UPDATE departments SET name = $1, description = $2 WHERE id = $3")
            .bind(name)
            .bind(description)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("department", id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // The row lock blocks concurrent membership inserts until commit.
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM departments WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?;
        if locked.is_none() {
            return Err(DomainError::not_found("department", id));
        }

        let members = sqlx::query_scalar::<_, i64>(
            "
            SELECT COUNT(*)
              FROM user_departments ud
              JOIN users u ON u.id = ud.user_id
             WHERE ud.department_id = $1 AND u.is_active
            ",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        if members > 0 {
            return Err(DomainError::DependentRecordsExist(
                "cannot delete department with existing users; reassign them first".into(),
            ));
        }

        sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)
    }
}
