//! # services
//!
//! Use cases of the portal. Each service owns `Arc`s of the ports it needs and
//! knows nothing about HTTP or SQL.

pub mod access;
pub mod audit;
pub mod auth;
pub mod comments;
pub mod departments;
pub mod documents;
pub mod notes;
pub mod notifications;
pub mod users;

pub use access::AccessControl;
pub use audit::AuditService;
pub use auth::{AuthService, ProfileChanges, Registration, Session};
pub use comments::CommentService;
pub use departments::DepartmentService;
pub use documents::{DocumentService, DocumentUpload};
pub use notes::{NoteDraft, NoteService};
pub use notifications::NotificationService;
pub use users::{UserChanges, UserDraft, UserService};

use domains::{DomainError, Result};

/// Trims a required text field, rejecting blanks.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Emails are matched case-insensitively, so they are stored lowercased.
pub(crate) fn email(value: &str) -> Result<String> {
    Ok(required("email", value)?.to_lowercase())
}

/// Trims an optional text field, mapping blanks to `None`.
pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
