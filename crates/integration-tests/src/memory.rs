//! In-memory implementations of every port, with the same observable
//! behavior as the PostgreSQL repositories: unique names and emails,
//! cascading deletes, restricted deletes of users who still own items.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use domains::{
    can_view, resolve, ActivityKind, ActivityRecord, ActivityRepository, Assignments, Audience,
    AuditEntry, Comment, CommentRepository, Department, DepartmentRepository, DepartmentSummary,
    Document, DocumentRepository, DocumentStats, DocumentView, DomainError, FileStorage, ItemKind,
    LogCategory, NewComment, NewDepartment, NewDocument, NewNote, NewNotification, NewUser, Note,
    NoteRepository, NoteStats, NoteView, Notification, NotificationRepository, PasswordHasher,
    Result, StoredFile, Upload, User, UserRepository, UserUpdate, Viewer, VisibilityRepository,
};

struct Event {
    seq: i64,
    kind: ItemKind,
    item_id: i64,
    user_id: i64,
    activity: ActivityKind,
    at: DateTime<Utc>,
}

struct StoredComment {
    id: i64,
    content: String,
    user_id: i64,
    item_type: ItemKind,
    item_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    next_id: i64,
    departments: BTreeMap<i64, Department>,
    users: BTreeMap<i64, User>,
    documents: BTreeMap<i64, Document>,
    notes: BTreeMap<i64, Note>,
    grants: HashMap<(ItemKind, i64), Assignments>,
    events: Vec<Event>,
    comments: Vec<StoredComment>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user(&self, id: i64) -> Result<&User> {
        self.users.get(&id).ok_or_else(|| DomainError::not_found("user", id))
    }

    fn grants_of(&self, kind: ItemKind, item_id: i64) -> Assignments {
        self.grants.get(&(kind, item_id)).cloned().unwrap_or_default()
    }

    fn visible(&self, viewer: &Viewer, kind: ItemKind, item_id: i64) -> bool {
        viewer.is_admin() || can_view(viewer, &self.grants_of(kind, item_id))
    }

    fn count(&self, kind: ItemKind, item_id: i64, activity: ActivityKind) -> i64 {
        self.events
            .iter()
            .filter(|e| e.kind == kind && e.item_id == item_id && e.activity == activity)
            .count() as i64
    }

    fn has_event(&self, kind: ItemKind, item_id: i64, user_id: i64, activity: ActivityKind) -> bool {
        self.events.iter().any(|e| {
            e.kind == kind && e.item_id == item_id && e.user_id == user_id && e.activity == activity
        })
    }

    fn names(&self, user_id: i64) -> (String, String, String) {
        self.users
            .get(&user_id)
            .map(|u| (u.first_name.clone(), u.last_name.clone(), u.email.clone()))
            .unwrap_or_default()
    }

    fn ensure_departments(&self, ids: &[i64]) -> Result<()> {
        match ids.iter().find(|id| !self.departments.contains_key(id)) {
            Some(id) => Err(DomainError::validation(format!("department {id} does not exist"))),
            None => Ok(()),
        }
    }

    fn remove_item(&mut self, kind: ItemKind, item_id: i64) {
        self.grants.remove(&(kind, item_id));
        self.events.retain(|e| !(e.kind == kind && e.item_id == item_id));
        self.comments.retain(|c| !(c.item_type == kind && c.item_id == item_id));
    }

    fn document_view(&self, document: &Document, user_id: i64) -> DocumentView {
        let (first, last, _) = self.names(document.uploaded_by);
        DocumentView {
            is_read: self.has_event(ItemKind::Document, document.id, user_id, ActivityKind::Read),
            is_downloaded: self.has_event(ItemKind::Document, document.id, user_id, ActivityKind::Download),
            document: document.clone(),
            uploader_first_name: first,
            uploader_last_name: last,
        }
    }

    fn note_view(&self, note: &Note, user_id: i64) -> NoteView {
        let (first, last, _) = self.names(note.created_by);
        NoteView {
            is_read: self.has_event(ItemKind::Note, note.id, user_id, ActivityKind::Read),
            note: note.clone(),
            author_first_name: first,
            author_last_name: last,
        }
    }
}

/// Shared handle over one set of tables. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a user without going through any service.
    pub fn insert_user(&self, user: NewUser) -> User {
        let mut tables = self.lock();
        let id = tables.next_id();
        let user = User {
            id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            is_active: true,
            department_ids: user.department_ids,
            created_at: Utc::now(),
            last_access: None,
        };
        tables.users.insert(id, user.clone());
        user
    }

    pub fn insert_department(&self, name: &str) -> i64 {
        let mut tables = self.lock();
        let id = tables.next_id();
        tables.departments.insert(
            id,
            Department { id, name: name.to_string(), description: None, created_at: Utc::now() },
        );
        id
    }

    pub fn user_snapshot(&self, id: i64) -> Option<User> {
        self.lock().users.get(&id).cloned()
    }

    pub fn notifications_of(&self, user_id: i64) -> Vec<Notification> {
        self.lock().notifications.iter().filter(|n| n.user_id == user_id).cloned().collect()
    }
}

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<DepartmentSummary>> {
        let tables = self.lock();
        let mut summaries: Vec<DepartmentSummary> = tables
            .departments
            .values()
            .map(|department| DepartmentSummary {
                department: department.clone(),
                user_count: tables
                    .users
                    .values()
                    .filter(|u| u.is_active && u.department_ids.contains(&department.id))
                    .count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| a.department.name.cmp(&b.department.name));
        Ok(summaries)
    }

    async fn find(&self, id: i64) -> Result<Option<Department>> {
        Ok(self.lock().departments.get(&id).cloned())
    }

    async fn create(&self, department: NewDepartment) -> Result<Department> {
        let mut tables = self.lock();
        if tables.departments.values().any(|d| d.name == department.name) {
            return Err(DomainError::Conflict("department name already exists".into()));
        }
        let id = tables.next_id();
        let created = Department {
            id,
            name: department.name,
            description: department.description,
            created_at: Utc::now(),
        };
        tables.departments.insert(id, created.clone());
        Ok(created)
    }

    async fn rename(&self, id: i64, name: String, description: Option<String>) -> Result<()> {
        let mut tables = self.lock();
        if tables.departments.values().any(|d| d.name == name && d.id != id) {
            return Err(DomainError::Conflict("department name already exists".into()));
        }
        let department = tables
            .departments
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("department", id))?;
        department.name = name;
        department.description = description;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        if !tables.departments.contains_key(&id) {
            return Err(DomainError::not_found("department", id));
        }
        let members = tables
            .users
            .values()
            .filter(|u| u.is_active && u.department_ids.contains(&id))
            .count();
        if members > 0 {
            return Err(DomainError::DependentRecordsExist(
                "cannot delete department with existing users; reassign them first".into(),
            ));
        }
        tables.departments.remove(&id);
        for user in tables.users.values_mut() {
            user.department_ids.retain(|d| *d != id);
        }
        for grants in tables.grants.values_mut() {
            grants.departments.retain(|d| *d != id);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.lock().users.values().rev().cloned().collect())
    }

    async fn list_active(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.lock().users.values().filter(|u| u.is_active).cloned().collect();
        users.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
        Ok(users)
    }

    async fn find(&self, id: i64) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool> {
        Ok(self
            .lock()
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        {
            let tables = self.lock();
            if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(DomainError::Conflict("user already exists".into()));
            }
            tables.ensure_departments(&user.department_ids)?;
        }
        Ok(self.insert_user(user))
    }

    async fn update(&self, id: i64, update: UserUpdate) -> Result<()> {
        let mut tables = self.lock();
        if let Some(ids) = &update.department_ids {
            tables.ensure_departments(ids)?;
        }
        let user = tables.users.get_mut(&id).ok_or_else(|| DomainError::not_found("user", id))?;
        user.first_name = update.first_name;
        user.last_name = update.last_name;
        user.email = update.email;
        user.role = update.role;
        user.is_active = update.is_active;
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        if let Some(ids) = update.department_ids {
            user.department_ids = ids;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        let owns_items = tables.documents.values().any(|d| d.uploaded_by == id)
            || tables.notes.values().any(|n| n.created_by == id);
        if owns_items {
            return Err(DomainError::validation("user still owns documents or notes"));
        }
        tables.users.remove(&id);
        tables.events.retain(|e| e.user_id != id);
        tables.comments.retain(|c| c.user_id != id);
        tables.notifications.retain(|n| n.user_id != id);
        for grants in tables.grants.values_mut() {
            grants.users.retain(|u| *u != id);
        }
        Ok(())
    }

    async fn department_ids(&self, id: i64) -> Result<Vec<i64>> {
        Ok(self.lock().users.get(&id).map(|u| u.department_ids.clone()).unwrap_or_default())
    }

    async fn departments(&self, id: i64) -> Result<Vec<Department>> {
        let tables = self.lock();
        let user = tables.user(id)?;
        let mut departments: Vec<Department> = user
            .department_ids
            .iter()
            .filter_map(|d| tables.departments.get(d).cloned())
            .collect();
        departments.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(departments)
    }

    async fn set_departments(&self, id: i64, department_ids: Vec<i64>) -> Result<()> {
        let mut tables = self.lock();
        tables.ensure_departments(&department_ids)?;
        let user = tables.users.get_mut(&id).ok_or_else(|| DomainError::not_found("user", id))?;
        user.department_ids = department_ids;
        Ok(())
    }

    async fn touch_last_access(&self, id: i64) -> Result<()> {
        if let Some(user) = self.lock().users.get_mut(&id) {
            user.last_access = Some(Utc::now());
        }
        Ok(())
    }

    async fn audience(&self, grants: &Assignments) -> Result<Vec<i64>> {
        Ok(self
            .lock()
            .users
            .values()
            .filter(|u| {
                u.is_active
                    && (grants.users.contains(&u.id)
                        || u.department_ids.iter().any(|d| grants.departments.contains(d)))
            })
            .map(|u| u.id)
            .collect())
    }
}

fn write_grants(tables: &mut Tables, kind: ItemKind, item_id: i64, audience: &Audience) -> Result<()> {
    tables.ensure_departments(audience.department_ids())?;
    if let Some(id) = audience.user_ids().iter().find(|id| !tables.users.contains_key(id)) {
        return Err(DomainError::validation(format!("user {id} does not exist")));
    }
    tables.grants.insert((kind, item_id), Assignments::from(audience));
    Ok(())
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn list_all(&self) -> Result<Vec<DocumentStats>> {
        let tables = self.lock();
        Ok(tables
            .documents
            .values()
            .rev()
            .map(|document| {
                let (first, last, _) = tables.names(document.uploaded_by);
                DocumentStats {
                    read_count: tables.count(ItemKind::Document, document.id, ActivityKind::Read),
                    download_count: tables.count(ItemKind::Document, document.id, ActivityKind::Download),
                    document: document.clone(),
                    uploader_first_name: first,
                    uploader_last_name: last,
                }
            })
            .collect())
    }

    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<DocumentView>> {
        let tables = self.lock();
        Ok(tables
            .documents
            .values()
            .rev()
            .filter(|d| tables.visible(viewer, ItemKind::Document, d.id))
            .map(|d| tables.document_view(d, viewer.user_id))
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<DocumentView>> {
        let tables = self.lock();
        Ok(tables.documents.get(&id).map(|d| tables.document_view(d, user_id)))
    }

    async fn create(&self, document: NewDocument, audience: Audience) -> Result<Document> {
        let mut tables = self.lock();
        tables.user(document.uploaded_by)?;
        let id = tables.next_id();
        write_grants(&mut tables, ItemKind::Document, id, &audience)?;
        let created = Document {
            id,
            title: document.title,
            description: document.description,
            file: document.file,
            uploaded_by: document.uploaded_by,
            created_at: Utc::now(),
        };
        tables.documents.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, title: String, description: Option<String>) -> Result<()> {
        let mut tables = self.lock();
        let document = tables
            .documents
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("document", id))?;
        document.title = title;
        document.description = description;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        tables.documents.remove(&id);
        tables.remove_item(ItemKind::Document, id);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn list_all(&self) -> Result<Vec<NoteStats>> {
        let tables = self.lock();
        Ok(tables
            .notes
            .values()
            .rev()
            .map(|note| {
                let (first, last, _) = tables.names(note.created_by);
                NoteStats {
                    read_count: tables.count(ItemKind::Note, note.id, ActivityKind::Read),
                    note: note.clone(),
                    author_first_name: first,
                    author_last_name: last,
                }
            })
            .collect())
    }

    async fn list_visible(&self, viewer: &Viewer) -> Result<Vec<NoteView>> {
        let tables = self.lock();
        Ok(tables
            .notes
            .values()
            .rev()
            .filter(|n| tables.visible(viewer, ItemKind::Note, n.id))
            .map(|n| tables.note_view(n, viewer.user_id))
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Note>> {
        Ok(self.lock().notes.get(&id).cloned())
    }

    async fn find_view(&self, id: i64, user_id: i64) -> Result<Option<NoteView>> {
        let tables = self.lock();
        Ok(tables.notes.get(&id).map(|n| tables.note_view(n, user_id)))
    }

    async fn create(&self, note: NewNote, audience: Audience) -> Result<Note> {
        let mut tables = self.lock();
        tables.user(note.created_by)?;
        let id = tables.next_id();
        write_grants(&mut tables, ItemKind::Note, id, &audience)?;
        let created = Note {
            id,
            title: note.title,
            content: note.content,
            created_by: note.created_by,
            created_at: Utc::now(),
        };
        tables.notes.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, title: String, content: String, audience: Option<Audience>) -> Result<()> {
        let mut tables = self.lock();
        if !tables.notes.contains_key(&id) {
            return Err(DomainError::not_found("note", id));
        }
        if let Some(audience) = &audience {
            write_grants(&mut tables, ItemKind::Note, id, audience)?;
        }
        if let Some(note) = tables.notes.get_mut(&id) {
            note.title = title;
            note.content = content;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.lock();
        tables.notes.remove(&id);
        tables.remove_item(ItemKind::Note, id);
        Ok(())
    }
}

#[async_trait]
impl VisibilityRepository for MemoryStore {
    async fn grants(&self, kind: ItemKind, item_id: i64) -> Result<Assignments> {
        Ok(self.lock().grants_of(kind, item_id))
    }

    async fn replace(&self, kind: ItemKind, item_id: i64, audience: Audience) -> Result<()> {
        write_grants(&mut self.lock(), kind, item_id, &audience)
    }

    async fn visible_ids(&self, kind: ItemKind, viewer: &Viewer) -> Result<Vec<i64>> {
        let tables = self.lock();
        if viewer.is_admin() {
            return Ok(match kind {
                ItemKind::Document => tables.documents.keys().copied().collect(),
                ItemKind::Note => tables.notes.keys().copied().collect(),
            });
        }
        let granted = tables
            .grants
            .iter()
            .filter(|((item_kind, _), _)| *item_kind == kind)
            .map(|((_, id), grants)| (*id, grants));
        Ok(resolve(viewer, granted).into_iter().collect())
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record(&self, kind: ItemKind, item_id: i64, user_id: i64, event: ActivityKind) -> Result<()> {
        let mut tables = self.lock();
        let seq = tables.next_id();
        tables.events.push(Event { seq, kind, item_id, user_id, activity: event, at: Utc::now() });
        Ok(())
    }

    async fn events(&self, kind: ItemKind, item_id: i64, event: ActivityKind) -> Result<Vec<ActivityRecord>> {
        let tables = self.lock();
        let mut matching: Vec<&Event> = tables
            .events
            .iter()
            .filter(|e| e.kind == kind && e.item_id == item_id && e.activity == event)
            .collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(matching
            .into_iter()
            .map(|e| {
                let (first_name, last_name, email) = tables.names(e.user_id);
                let departments = tables
                    .users
                    .get(&e.user_id)
                    .map(|u| {
                        u.department_ids
                            .iter()
                            .filter_map(|d| tables.departments.get(d).map(|d| d.name.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                ActivityRecord { user_id: e.user_id, first_name, last_name, email, departments, timestamp: e.at }
            })
            .collect())
    }

    async fn recent(&self, category: LogCategory, limit: i64) -> Result<Vec<AuditEntry>> {
        let tables = self.lock();
        let mut matching: Vec<&Event> = tables
            .events
            .iter()
            .filter(|e| e.kind == category.item_kind() && e.activity == category.activity())
            .collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(matching
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|e| {
                let item_title = match e.kind {
                    ItemKind::Document => tables.documents.get(&e.item_id).map(|d| d.title.clone()),
                    ItemKind::Note => tables.notes.get(&e.item_id).map(|n| n.title.clone()),
                }
                .unwrap_or_default();
                let (first_name, last_name, email) = tables.names(e.user_id);
                AuditEntry {
                    category,
                    timestamp: e.at,
                    item_id: e.item_id,
                    item_title,
                    first_name,
                    last_name,
                    email,
                }
            })
            .collect())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: NewComment) -> Result<i64> {
        let mut tables = self.lock();
        let id = tables.next_id();
        tables.comments.push(StoredComment {
            id,
            content: comment.content,
            user_id: comment.user_id,
            item_type: comment.item_type,
            item_id: comment.item_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list(&self, kind: ItemKind, item_id: i64) -> Result<Vec<Comment>> {
        let tables = self.lock();
        Ok(tables
            .comments
            .iter()
            .rev()
            .filter(|c| c.item_type == kind && c.item_id == item_id)
            .map(|c| {
                let (first_name, last_name, email) = tables.names(c.user_id);
                Comment {
                    id: c.id,
                    content: c.content.clone(),
                    user_id: c.user_id,
                    item_type: c.item_type,
                    item_id: c.item_id,
                    created_at: c.created_at,
                    first_name,
                    last_name,
                    email,
                }
            })
            .collect())
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_many(&self, notifications: Vec<NewNotification>) -> Result<()> {
        let mut tables = self.lock();
        for notification in notifications {
            let id = tables.next_id();
            tables.notifications.push(Notification {
                id,
                user_id: notification.user_id,
                title: notification.title,
                message: notification.message,
                kind: notification.kind,
                is_read: false,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn list(&self, user_id: i64, limit: i64) -> Result<Vec<Notification>> {
        Ok(self
            .lock()
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: i64, user_id: i64) -> Result<bool> {
        let mut tables = self.lock();
        match tables.notifications.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Uploads kept in a map keyed by their stored path.
#[derive(Clone, Default)]
pub struct MemoryFiles {
    files: Arc<Mutex<BTreeMap<String, Bytes>>>,
}

impl MemoryFiles {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Bytes>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.lock().contains_key(file_path)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[async_trait]
impl FileStorage for MemoryFiles {
    async fn save(&self, upload: Upload) -> Result<StoredFile> {
        let mut files = self.lock();
        let file_path = format!("{}/{}-{}", upload.folder, files.len() + 1, upload.file_name);
        let stored = StoredFile {
            public_url: format!("/uploads/{file_path}"),
            file_path: file_path.clone(),
            file_name: upload.file_name,
            file_size: upload.data.len() as i64,
            mime_type: upload.content_type.to_string(),
        };
        files.insert(file_path, upload.data);
        Ok(stored)
    }

    async fn delete(&self, file_path: &str) -> Result<()> {
        self.lock().remove(file_path);
        Ok(())
    }
}

/// Reversible "hash" so tests skip the cost of Argon2.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash.strip_prefix("plain$") == Some(password)
    }
}
