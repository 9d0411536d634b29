use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use domains::{
    Assignments, Department, DomainError, NewUser, Result, Role, User, UserRepository, UserUpdate,
};

use super::db_error;
use super::departments::DepartmentRow;

const SELECT_USER: &str = "
    SELECT u.id, u.first_name, u.last_name, u.email, u.password_hash, u.role, u.is_active,
           ARRAY(SELECT ud.department_id
                   FROM user_departments ud
                  WHERE ud.user_id = u.id
                  ORDER BY ud.department_id) AS department_ids,
           u.created_at, u.last_access
      FROM users u
";

#[derive(FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    department_ids: Vec<i64>,
    created_at: DateTime<Utc>,
    last_access: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>().map_err(DomainError::internal)?,
            is_active: row.is_active,
            department_ids: row.department_ids,
            created_at: row.created_at,
            last_access: row.last_access,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

async fn write_memberships(conn: &mut PgConnection, user_id: i64, department_ids: &[i64]) -> Result<()> {
    sqlx::query(
        "
        INSERT INTO user_departments (user_id, department_id)
        SELECT $1, d FROM UNNEST($2::BIGINT[]) AS d
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(user_id)
    .bind(department_ids)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;
    Ok(())
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} ORDER BY u.created_at DESC, u.id DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        into_users(rows)
    }

    async fn list_active(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "{SELECT_USER} WHERE u.is_active ORDER BY u.first_name, u.last_name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        into_users(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE lower(u.email) = lower($1)"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .map(User::try_from)
            .transpose()
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let id = sqlx::query_scalar::<_, i64>(
            "
            INSERT INTO users (first_name, last_name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            ",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        write_memberships(&mut tx, id, &user.department_ids).await?;
        tx.commit().await.map_err(db_error)?;

        self.find(id)
            .await?
            .ok_or_else(|| DomainError::internal(format!("user {id} vanished after insert")))
    }

    async fn update(&self, id: i64, update: UserUpdate) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let result = sqlx::query(
            "
            UPDATE users
               SET first_name = $1, last_name = $2, email = $3, role = $4, is_active = $5,
                   password_hash = COALESCE($6, password_hash)
             WHERE id = $7
            ",
        )
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.email)
        .bind(update.role.as_str())
        .bind(update.is_active)
        .bind(update.password_hash)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }

        if let Some(department_ids) = update.department_ids {
            sqlx::query("DELETE FROM user_departments WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            write_memberships(&mut tx, id, &department_ids).await?;
        }

        tx.commit().await.map_err(db_error)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    async fn department_ids(&self, id: i64) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT department_id FROM user_departments WHERE user_id = $1 ORDER BY department_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn departments(&self, id: i64) -> Result<Vec<Department>> {
        let rows = sqlx::query_as::<_, DepartmentRow>(
            "
            SELECT d.id, d.name, d.description, d.created_at
              FROM departments d
              JOIN user_departments ud ON ud.department_id = d.id
             WHERE ud.user_id = $1
             ORDER BY d.name
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_departments(&self, id: i64, department_ids: Vec<i64>) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx::query("DELETE FROM user_departments WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        write_memberships(&mut tx, id, &department_ids).await?;
        tx.commit().await.map_err(db_error)
    }

    async fn touch_last_access(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_access = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn audience(&self, grants: &Assignments) -> Result<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "
            SELECT u.id
              FROM users u
             WHERE u.is_active
               AND (u.id = ANY($1)
                    OR EXISTS (SELECT 1
                                 FROM user_departments ud
                                WHERE ud.user_id = u.id AND ud.department_id = ANY($2)))
             ORDER BY u.id
            ",
        )
        .bind(&grants.users)
        .bind(&grants.departments)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }
}
