//! # PostgreSQL repositories
//!
//! Every repository wraps the same `PgPool`. Multi-statement writes run in a
//! transaction started with `pool.begin()`.

mod activity;
mod comments;
mod departments;
mod documents;
mod notes;
mod notifications;
mod users;
mod visibility;

pub use activity::PgActivityRepository;
pub use comments::PgCommentRepository;
pub use departments::PgDepartmentRepository;
pub use documents::PgDocumentRepository;
pub use notes::PgNoteRepository;
pub use notifications::PgNotificationRepository;
pub use users::PgUserRepository;
pub use visibility::PgVisibilityRepository;

use domains::{DomainError, ItemKind, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(db_error)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DomainError::internal)
}

/// Unique violations become `Conflict`, foreign key violations `Validation`,
/// everything else `Internal`.
pub(crate) fn db_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                let message = match db.constraint() {
                    Some("departments_name_key") => "department name already exists",
                    Some("users_email_key") => "user already exists",
                    _ => "record already exists",
                };
                return DomainError::Conflict(message.into());
            }
            Some("23503") => {
                return DomainError::validation("referenced record does not exist or is still in use");
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "database error");
    DomainError::internal(err)
}

/// Table names of one item kind.
pub(crate) struct ItemTables {
    pub items: &'static str,
    /// Foreign key column in the grant and log tables
    pub key: &'static str,
    pub department_grants: &'static str,
    pub user_grants: &'static str,
    pub reads: &'static str,
}

pub(crate) fn tables(kind: ItemKind) -> ItemTables {
    match kind {
        ItemKind::Document => ItemTables {
            items: "documents",
            key: "document_id",
            department_grants: "document_department_visibility",
            user_grants: "document_user_visibility",
            reads: "document_reads",
        },
        ItemKind::Note => ItemTables {
            items: "notes",
            key: "note_id",
            department_grants: "note_department_visibility",
            user_grants: "note_user_visibility",
            reads: "note_reads",
        },
    }
}

#[cfg(test)]
mod tests {
    //! Run with `DATABASE_URL=postgres://... cargo test -p storage-adapters --features db-postgres -- --ignored`

    use super::*;
    use domains::{
        ActivityKind, ActivityRepository, Audience, DepartmentRepository, DocumentRepository,
        NewDepartment, NewDocument, NewUser, Role, StoredFile, UserRepository, Viewer,
        VisibilityRepository,
    };

    async fn pool() -> PgPool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = connect(&url, 2).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{}", uuid::Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore]
    async fn test_department_with_active_member_counts() {
        let pool = pool().await;
        let departments = PgDepartmentRepository::new(pool.clone());
        let users = PgUserRepository::new(pool.clone());

        let dept = departments
            .create(NewDepartment { name: unique("Finance"), description: None })
            .await
            .unwrap();
        let user = users
            .create(NewUser {
                first_name: "Mario".into(),
                last_name: "Rossi".into(),
                email: format!("{}@company.com", unique("mario")),
                password_hash: "x".into(),
                role: Role::User,
                department_ids: vec![dept.id],
            })
            .await
            .unwrap();

        assert_eq!(users.department_ids(user.id).await.unwrap(), vec![dept.id]);
        let in_use = departments.delete(dept.id).await.unwrap_err();
        assert!(matches!(in_use, DomainError::DependentRecordsExist(_)));
        assert!(departments.find(dept.id).await.unwrap().is_some());

        let duplicate = departments
            .create(NewDepartment { name: dept.name.clone(), description: None })
            .await
            .unwrap_err();
        assert!(matches!(duplicate, DomainError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visibility_union_and_replace() {
        let pool = pool().await;
        let departments = PgDepartmentRepository::new(pool.clone());
        let users = PgUserRepository::new(pool.clone());
        let documents = PgDocumentRepository::new(pool.clone());
        let grants = PgVisibilityRepository::new(pool.clone());
        let activity = PgActivityRepository::new(pool.clone());

        let d3 = departments.create(NewDepartment { name: unique("D3"), description: None }).await.unwrap();
        let d7 = departments.create(NewDepartment { name: unique("D7"), description: None }).await.unwrap();
        let reader = users
            .create(NewUser {
                first_name: "Anna".into(),
                last_name: "Neri".into(),
                email: format!("{}@company.com", unique("anna")),
                password_hash: "x".into(),
                role: Role::User,
                department_ids: vec![d3.id],
            })
            .await
            .unwrap();

        let doc = documents
            .create(
                NewDocument {
                    title: "Plan".into(),
                    description: None,
                    file: StoredFile {
                        file_path: "/tmp/plan.pdf".into(),
                        file_name: "plan.pdf".into(),
                        public_url: "/uploads/documents/plan.pdf".into(),
                        file_size: 1,
                        mime_type: "application/pdf".into(),
                    },
                    uploaded_by: reader.id,
                },
                Audience::departments(vec![d3.id, d7.id]).unwrap(),
            )
            .await
            .unwrap();

        let viewer = Viewer::new(reader.id, Role::User, vec![d3.id]);
        let visible = grants.visible_ids(ItemKind::Document, &viewer).await.unwrap();
        assert!(visible.contains(&doc.id));

        grants
            .replace(ItemKind::Document, doc.id, Audience::departments(vec![d7.id]).unwrap())
            .await
            .unwrap();
        let visible = grants.visible_ids(ItemKind::Document, &viewer).await.unwrap();
        assert!(!visible.contains(&doc.id));

        activity.record(ItemKind::Document, doc.id, reader.id, ActivityKind::Read).await.unwrap();
        activity.record(ItemKind::Document, doc.id, reader.id, ActivityKind::Read).await.unwrap();
        let reads = activity.events(ItemKind::Document, doc.id, ActivityKind::Read).await.unwrap();
        assert_eq!(reads.len(), 2);
    }
}
