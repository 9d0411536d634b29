//! # Core Traits (Ports)
//!
//! Any adapter must implement these traits to be used by the binary.
//! Multi-statement writes (`create` with grants, `replace`, `set_departments`)
//! are all-or-nothing: implementations run them in a single transaction.

use async_trait::async_trait;
use bytes::Bytes;

use crate::activity::{ActivityKind, ActivityRecord, AuditEntry, LogCategory};
use crate::errors::Result;
use crate::models::{
    Comment, Department, DepartmentSummary, Document, DocumentStats, DocumentView, IssuedToken,
    ItemKind, NewComment, NewDepartment, NewDocument, NewNote, NewNotification, NewUser, Note,
    NoteStats, NoteView, Notification, SessionClaims, StoredFile, User, UserUpdate,
};
use crate::visibility::{Assignments, Audience, Viewer};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// All departments by name, with active member counts.
    async fn list(&self) -> Result<Vec<DepartmentSummary>>;
    async fn find(&self, id: i64) -> Result<Option<Department>>;
    /// Fails with `Conflict` on a duplicate name.
    async fn create(&self, department: NewDepartment) -> Result<Department>;
    /// Fails with `NotFound` or `Conflict`.
    async fn rename(&self, id: i64, name: String, description: Option<String>) -> Result<()>;
    /// Fails with `DependentRecordsExist` while an active user is a member.
    /// The check and the delete are one transaction.
    async fn delete(&self, id: i64) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every account, newest first.
    async fn list(&self) -> Result<Vec<User>>;
    /// Active accounts by name, for grant pickers.
    async fn list_active(&self) -> Result<Vec<User>>;
    async fn find(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Is the email used by any account other than `except`?
    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool>;
    /// Inserts the user and their memberships together.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn update(&self, id: i64, update: UserUpdate) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
    async fn department_ids(&self, id: i64) -> Result<Vec<i64>>;
    async fn departments(&self, id: i64) -> Result<Vec<Department>>;
    /// Replaces the membership set.
    async fn set_departments(&self, id: i64, department_ids: Vec<i64>) -> Result<()>;
    async fn touch_last_access(&self, id: i64) -> Result<()>;
    /// Active users covered by a grant set (department members plus direct grants).
    async fn audience(&self, grants: &Assignments) -> Result<Vec<i64>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Every document, newest first, with read/download totals.
    async fn list_all(&self) -> Result<Vec<DocumentStats>>;
    /// Documents the viewer may see, newest first, flagged for that viewer.
    /// Administrators see every document.
    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<DocumentView>>;
    async fn find(&self, id: i64) -> Result<Option<Document>>;
    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<DocumentView>>;
    /// Inserts the document and its grants together.
    async fn create(&self, document: NewDocument, audience: Audience) -> Result<Document>;
    async fn update(&self, id: i64, title: String, description: Option<String>) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NoteRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<NoteStats>>;
    /// Administrators see every note.
    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<NoteView>>;
    async fn find(&self, id: i64) -> Result<Option<Note>>;
    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<NoteView>>;
    async fn create(&self, note: NewNote, audience: Audience) -> Result<Note>;
    /// Updates the text and, when given, replaces the grants in the same transaction.
    async fn update(&self, id: i64, title: String, content: String, audience: Option<Audience>) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Grant tables of both item kinds.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VisibilityRepository: Send + Sync {
    async fn grants(&self, kind: ItemKind, item_id: i64) -> Result<Assignments>;
    /// Deletes every grant of the item in both tables and inserts the new set.
    async fn replace(&self, kind: ItemKind, item_id: i64, audience: Audience) -> Result<()>;
    /// Union of department grants and user grants for the viewer.
    /// Administrators get every item id.
    async fn visible_ids(&self, kind: ItemKind, viewer: &Viewer) -> Result<Vec<i64>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn record(&self, kind: ItemKind, item_id: i64, user_id: i64, event: ActivityKind) -> Result<()>;
    /// Every event of the item, newest first.
    async fn events(&self, kind: ItemKind, item_id: i64, event: ActivityKind) -> Result<Vec<ActivityRecord>>;
    /// Most recent events of one category across all items.
    async fn recent(&self, category: LogCategory, limit: i64) -> Result<Vec<AuditEntry>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<i64>;
    /// Newest first.
    async fn list(&self, kind: ItemKind, item_id: i64) -> Result<Vec<Comment>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_many(&self, notifications: Vec<NewNotification>) -> Result<()>;
    /// Newest first.
    async fn list(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>>;
    /// Returns false when no notification with that id belongs to the user.
    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool>;
}

/// An uploaded file on its way to storage.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Sub-folder under the storage root (e.g. "documents")
    pub folder: String,
    pub file_name: String,
    pub content_type: mime::Mime,
    pub data: Bytes,
}

/// File storage contract for uploaded documents.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists the upload under a collision-free name.
    async fn save(&self, upload: Upload) -> Result<StoredFile>;
    /// Removes a stored file. Missing files are not an error.
    async fn delete(&self, file_path: &str) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> bool;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<IssuedToken>;
    /// Checks signature and expiry. Any failure is `InvalidToken`.
    fn verify(&self, token: &str) -> Result<SessionClaims>;
}
