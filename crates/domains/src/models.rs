//! # Domain Models
//!
//! These structs represent the core entities of the portal.
//! Identifiers are database-assigned `i64`s.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Account role. Administrators manage every entity and bypass visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Administrator => "administrator",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "administrator" => Ok(Role::Administrator),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Department listing row with the number of active members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    #[serde(flatten)]
    pub department: Department,
    pub user_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDepartment {
    pub name: String,
    pub description: Option<String>,
}

/// A portal account. Department membership is many-to-many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Argon2 PHC string; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub department_ids: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub last_access: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn actor(&self) -> Actor {
        Actor { id: self.id, role: self.role }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub department_ids: Vec<i64>,
}

/// Full replacement of the mutable user columns.
/// `password_hash` and `department_ids` are left untouched when `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub password_hash: Option<String>,
    pub department_ids: Option<Vec<i64>>,
}

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Department memberships at the time the token was minted
    pub departments: Vec<i64>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn actor(&self) -> Actor {
        Actor { id: self.sub, role: self.role }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Backend-specific location (filesystem path or remote FTP path)
    pub file_path: String,
    /// Name the file had on the uploader's machine
    pub file_name: String,
    pub public_url: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub file: StoredFile,
    pub uploaded_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub file: StoredFile,
    pub uploaded_by: i64,
}

/// A document as listed for one reader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub uploader_first_name: String,
    pub uploader_last_name: String,
    pub is_read: bool,
    pub is_downloaded: bool,
}

/// A document as listed for administrators, with event totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentStats {
    #[serde(flatten)]
    pub document: Document,
    pub uploader_first_name: String,
    pub uploader_last_name: String,
    pub read_count: i64,
    pub download_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    pub created_by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteView {
    #[serde(flatten)]
    pub note: Note,
    pub author_first_name: String,
    pub author_last_name: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteStats {
    #[serde(flatten)]
    pub note: Note,
    pub author_first_name: String,
    pub author_last_name: String,
    pub read_count: i64,
}

/// The two kinds of shareable item. Both use the same grant model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Document,
    Note,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Document => "document",
            ItemKind::Note => "note",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(ItemKind::Document),
            "note" => Ok(ItemKind::Note),
            other => Err(DomainError::validation(format!("unknown item type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub item_type: ItemKind,
    pub item_id: i64,
    pub created_at: DateTime<Utc>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub user_id: i64,
    pub item_type: ItemKind,
    pub item_id: i64,
}

/// Per-user inbox row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub kind: ItemKind,
}
