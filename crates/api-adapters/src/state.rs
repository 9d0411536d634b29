use std::sync::Arc;

use domains::{
    ActivityRepository, CommentRepository, DepartmentRepository, DocumentRepository, FileStorage,
    NoteRepository, NotificationRepository, PasswordHasher, TokenIssuer, UserRepository,
    VisibilityRepository,
};
use services::{
    AccessControl, AuditService, AuthService, CommentService, DepartmentService, DocumentService,
    NoteService, NotificationService, UserService,
};

use crate::metrics::Metrics;

/// Every adapter the services need, created once by the binary.
#[derive(Clone)]
pub struct Ports {
    pub departments: Arc<dyn DepartmentRepository>,
    pub users: Arc<dyn UserRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub visibility: Arc<dyn VisibilityRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub storage: Arc<dyn FileStorage>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenIssuer>,
}

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub departments: Arc<DepartmentService>,
    pub users: Arc<UserService>,
    pub documents: Arc<DocumentService>,
    pub notes: Arc<NoteService>,
    pub comments: Arc<CommentService>,
    pub notifications: NotificationService,
    pub audit: Arc<AuditService>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(ports: Ports, metrics: Arc<Metrics>) -> Self {
        let access = AccessControl::new(ports.users.clone(), ports.visibility.clone());
        let notifications = NotificationService::new(ports.notifications.clone(), ports.users.clone());

        Self {
            auth: Arc::new(AuthService::new(ports.users.clone(), ports.hasher.clone(), ports.tokens)),
            departments: Arc::new(DepartmentService::new(ports.departments)),
            users: Arc::new(UserService::new(ports.users.clone(), ports.hasher)),
            documents: Arc::new(DocumentService::new(
                ports.documents.clone(),
                ports.activity.clone(),
                ports.users.clone(),
                ports.storage,
                access.clone(),
                notifications.clone(),
            )),
            notes: Arc::new(NoteService::new(
                ports.notes.clone(),
                ports.activity.clone(),
                ports.users.clone(),
                access.clone(),
                notifications.clone(),
            )),
            comments: Arc::new(CommentService::new(
                ports.comments,
                ports.documents,
                ports.notes,
                ports.users,
                access,
            )),
            notifications,
            audit: Arc::new(AuditService::new(ports.activity)),
            metrics,
        }
    }
}
