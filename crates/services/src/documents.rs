//! Document publishing, reading and auditing.

use std::sync::Arc;

use bytes::Bytes;

use domains::{
    latest_per_user, ActivityKind, ActivityRepository, Actor, Assignments, Audience, Document,
    DocumentRepository, DocumentStats, DocumentView, DomainError, FileStorage, ItemActivity,
    ItemKind, NewDocument, Result, Upload, UserRepository,
};

use crate::{optional, required, AccessControl, NotificationService};

const FOLDER: &str = "documents";

/// A file received from an uploader, before it is stored.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: mime::Mime,
    pub data: Bytes,
}

pub struct DocumentService {
    documents: Arc<dyn DocumentRepository>,
    activity: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn FileStorage>,
    access: AccessControl,
    notifications: NotificationService,
}

impl DocumentService {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        activity: Arc<dyn ActivityRepository>,
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn FileStorage>,
        access: AccessControl,
        notifications: NotificationService,
    ) -> Self {
        Self { documents, activity, users, storage, access, notifications }
    }

    /// Documents visible to the caller, flagged with their own read/download state.
    pub async fn list_for(&self, actor: Actor) -> Result<Vec<DocumentView>> {
        let viewer = self.access.viewer(actor).await?;
        self.documents.list_visible(&viewer).await
    }

    pub async fn list_all(&self) -> Result<Vec<DocumentStats>> {
        self.documents.list_all().await
    }

    pub async fn get(&self, actor: Actor, id: i64) -> Result<DocumentView> {
        let view = self
            .documents
            .find_view(id, actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("document", id))?;
        let viewer = self.access.viewer(actor).await?;
        self.access.ensure_visible(&viewer, ItemKind::Document, id).await?;
        Ok(view)
    }

    /// Stores the file, then writes the row and its grants together.
    /// The stored file is removed again if the row cannot be written.
    #[tracing::instrument(skip(self, upload, audience), fields(user_id = actor.id, file = %upload.file_name))]
    pub async fn create(&self, actor: Actor, upload: DocumentUpload, audience: Audience) -> Result<Document> {
        let title = required("title", &upload.title)?;
        if upload.file_name.trim().is_empty() || upload.data.is_empty() {
            return Err(DomainError::validation("file is required"));
        }

        let stored = self
            .storage
            .save(Upload {
                folder: FOLDER.to_string(),
                file_name: upload.file_name,
                content_type: upload.content_type,
                data: upload.data,
            })
            .await?;
        let file_path = stored.file_path.clone();

        let grants = Assignments::from(&audience);
        let new = NewDocument {
            title,
            description: optional(upload.description),
            file: stored,
            uploaded_by: actor.id,
        };
        let document = match self.documents.create(new, audience).await {
            Ok(document) => document,
            Err(err) => {
                if let Err(cleanup) = self.storage.delete(&file_path).await {
                    tracing::warn!(error = %cleanup, %file_path, "failed to remove orphaned upload");
                }
                return Err(err);
            }
        };

        tracing::info!(document_id = document.id, size = document.file.file_size, "document published");
        self.notifications.announce(ItemKind::Document, &document.title, actor, &grants).await;
        Ok(document)
    }

    pub async fn update(&self, id: i64, title: &str, description: Option<String>) -> Result<()> {
        let title = required("title", title)?;
        self.find(id).await?;
        self.documents.update(id, title, optional(description)).await
    }

    /// Removes the row (grants, logs and comments go with it) and the stored file.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let document = self.find(id).await?;
        self.documents.delete(id).await?;
        if let Err(err) = self.storage.delete(&document.file.file_path).await {
            tracing::warn!(error = %err, document_id = id, "stored file left behind");
        }
        tracing::info!(document_id = id, "document deleted");
        Ok(())
    }

    pub async fn record_read(&self, actor: Actor, id: i64) -> Result<()> {
        self.record(actor, id, ActivityKind::Read).await?;
        Ok(())
    }

    /// Logs the download and hands back the URL the file is served from.
    pub async fn record_download(&self, actor: Actor, id: i64) -> Result<String> {
        let document = self.record(actor, id, ActivityKind::Download).await?;
        Ok(document.file.public_url)
    }

    async fn record(&self, actor: Actor, id: i64, event: ActivityKind) -> Result<Document> {
        let document = self.find(id).await?;
        let viewer = self.access.viewer(actor).await?;
        self.access.ensure_visible(&viewer, ItemKind::Document, id).await?;

        self.activity.record(ItemKind::Document, id, actor.id, event).await?;
        self.users.touch_last_access(actor.id).await?;
        tracing::debug!(document_id = id, user_id = actor.id, event = event.as_str(), "activity recorded");
        Ok(document)
    }

    pub async fn assignments(&self, id: i64) -> Result<Assignments> {
        self.find(id).await?;
        self.access.assignments(ItemKind::Document, id).await
    }

    /// Grants of a document, for its uploader or anyone who can see it.
    pub async fn grants_for(&self, actor: Actor, id: i64) -> Result<Assignments> {
        let document = self.find(id).await?;
        if document.uploaded_by != actor.id {
            let viewer = self.access.viewer(actor).await?;
            self.access.ensure_visible(&viewer, ItemKind::Document, id).await?;
        }
        self.access.assignments(ItemKind::Document, id).await
    }

    pub async fn set_visibility(&self, id: i64, audience: Audience) -> Result<()> {
        self.find(id).await?;
        self.access.replace(ItemKind::Document, id, audience).await
    }

    /// Every read, plus the latest download of each user.
    pub async fn activity(&self, id: i64) -> Result<ItemActivity> {
        self.find(id).await?;
        let reads = self.activity.events(ItemKind::Document, id, ActivityKind::Read).await?;
        let downloads = self.activity.events(ItemKind::Document, id, ActivityKind::Download).await?;
        Ok(ItemActivity { reads, downloads: Some(latest_per_user(downloads)) })
    }

    async fn find(&self, id: i64) -> Result<Document> {
        self.documents
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found("document", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{
        MockActivityRepository, MockDocumentRepository, MockFileStorage, MockNotificationRepository,
        MockUserRepository, MockVisibilityRepository, Role, StoredFile,
    };
    use mockall::predicate::eq;

    fn stored() -> StoredFile {
        StoredFile {
            file_path: "uploads/documents/5f1c.pdf".into(),
            file_name: "budget.pdf".into(),
            public_url: "/uploads/documents/5f1c.pdf".into(),
            file_size: 3,
            mime_type: "application/pdf".into(),
        }
    }

    fn document(id: i64) -> Document {
        Document {
            id,
            title: "Budget".into(),
            description: None,
            file: stored(),
            uploaded_by: 1,
            created_at: Utc::now(),
        }
    }

    fn upload() -> DocumentUpload {
        DocumentUpload {
            title: "Budget".into(),
            description: Some("  ".into()),
            file_name: "budget.pdf".into(),
            content_type: mime::APPLICATION_PDF,
            data: Bytes::from_static(b"pdf"),
        }
    }

    struct Mocks {
        documents: MockDocumentRepository,
        activity: MockActivityRepository,
        users: MockUserRepository,
        storage: MockFileStorage,
        grants: MockVisibilityRepository,
        notifications: MockNotificationRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                documents: MockDocumentRepository::new(),
                activity: MockActivityRepository::new(),
                users: MockUserRepository::new(),
                storage: MockFileStorage::new(),
                grants: MockVisibilityRepository::new(),
                notifications: MockNotificationRepository::new(),
            }
        }

        fn build(self) -> DocumentService {
            let users: Arc<dyn UserRepository> = Arc::new(self.users);
            let access = AccessControl::new(users.clone(), Arc::new(self.grants));
            let notifications = NotificationService::new(Arc::new(self.notifications), users.clone());
            DocumentService::new(
                Arc::new(self.documents),
                Arc::new(self.activity),
                users,
                Arc::new(self.storage),
                access,
                notifications,
            )
        }
    }

    fn admin() -> Actor {
        Actor { id: 1, role: Role::Administrator }
    }

    #[tokio::test]
    async fn failed_insert_removes_stored_file() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_save().times(1).returning(|_| Ok(stored()));
        mocks
            .storage
            .expect_delete()
            .with(eq("uploads/documents/5f1c.pdf"))
            .times(1)
            .returning(|_| Ok(()));
        mocks
            .documents
            .expect_create()
            .returning(|_, _| Err(DomainError::internal("insert failed")));

        let service = mocks.build();
        let audience = Audience::departments(vec![3]).unwrap();
        let err = service.create(admin(), upload(), audience).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[tokio::test]
    async fn create_stores_then_announces() {
        let mut mocks = Mocks::new();
        mocks
            .storage
            .expect_save()
            .withf(|u| u.folder == "documents" && u.file_name == "budget.pdf")
            .returning(|_| Ok(stored()));
        mocks
            .documents
            .expect_create()
            .withf(|new, audience| new.description.is_none() && audience.department_ids() == [3, 7])
            .returning(|_, _| Ok(document(12)));
        mocks.users.expect_find().returning(|_| Ok(None));
        mocks.users.expect_audience().returning(|_| Ok(vec![1, 8]));
        mocks
            .notifications
            .expect_create_many()
            .withf(|rows| rows.len() == 1 && rows[0].user_id == 8)
            .times(1)
            .returning(|_| Ok(()));

        let service = mocks.build();
        let audience = Audience::departments(vec![7, 3]).unwrap();
        let created = service.create(admin(), upload(), audience).await.unwrap();
        assert_eq!(created.id, 12);
    }

    #[tokio::test]
    async fn missing_file_is_rejected_before_storage() {
        let mut mocks = Mocks::new();
        mocks.storage.expect_save().never();

        let service = mocks.build();
        let empty = DocumentUpload { data: Bytes::new(), ..upload() };
        let err = service
            .create(admin(), empty, Audience::users(vec![2]).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn reads_outside_grants_are_denied_and_not_logged() {
        let mut mocks = Mocks::new();
        mocks.documents.expect_find().returning(|id| Ok(Some(document(id))));
        mocks.users.expect_department_ids().returning(|_| Ok(vec![3]));
        mocks
            .grants
            .expect_grants()
            .returning(|_, _| Ok(Assignments { departments: vec![7], users: vec![] }));
        mocks.activity.expect_record().never();

        let service = mocks.build();
        let err = service.record_read(Actor { id: 5, role: Role::User }, 40).await.unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied));
    }

    #[tokio::test]
    async fn download_returns_public_url_and_touches_access() {
        let mut mocks = Mocks::new();
        mocks.documents.expect_find().returning(|id| Ok(Some(document(id))));
        mocks.users.expect_department_ids().returning(|_| Ok(vec![3]));
        mocks
            .grants
            .expect_grants()
            .returning(|_, _| Ok(Assignments { departments: vec![3], users: vec![] }));
        mocks
            .activity
            .expect_record()
            .with(eq(ItemKind::Document), eq(40), eq(5), eq(ActivityKind::Download))
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        mocks.users.expect_touch_last_access().with(eq(5)).times(1).returning(|_| Ok(()));

        let service = mocks.build();
        let url = service.record_download(Actor { id: 5, role: Role::User }, 40).await.unwrap();
        assert_eq!(url, "/uploads/documents/5f1c.pdf");
    }

    #[tokio::test]
    async fn unknown_document_is_not_found_before_visibility() {
        let mut mocks = Mocks::new();
        mocks.documents.expect_find_view().returning(|_, _| Ok(None));
        mocks.grants.expect_grants().never();

        let service = mocks.build();
        let err = service.get(Actor { id: 5, role: Role::User }, 404).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { resource: "document", .. }));
    }

    #[tokio::test]
    async fn delete_keeps_going_when_file_removal_fails() {
        let mut mocks = Mocks::new();
        mocks.documents.expect_find().returning(|id| Ok(Some(document(id))));
        mocks.documents.expect_delete().with(eq(12)).times(1).returning(|_| Ok(()));
        mocks
            .storage
            .expect_delete()
            .returning(|_| Err(DomainError::internal("ftp timeout")));

        mocks.build().delete(12).await.unwrap();
    }
}
