//! Request and response bodies.
//!
//! Account forms use snake_case keys; grant and comment payloads use the
//! camelCase keys the portal front end sends.

use serde::{Deserialize, Serialize};

use domains::{Assignments, Audience, AudienceKind, DomainError, ItemKind, Role};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Accepts a list of departments, or the single `department_id` of older clients.
fn merge_departments(mut ids: Vec<i64>, single: Option<i64>) -> Vec<i64> {
    if let Some(id) = single {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub department_ids: Vec<i64>,
    pub department_id: Option<i64>,
}

impl RegisterRequest {
    pub fn departments(&self) -> Vec<i64> {
        merge_departments(self.department_ids.clone(), self.department_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub department_ids: Vec<i64>,
    pub department_id: Option<i64>,
}

impl CreateUserRequest {
    pub fn departments(&self) -> Vec<i64> {
        merge_departments(self.department_ids.clone(), self.department_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    /// Absent keeps the stored role.
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub department_ids: Option<Vec<i64>>,
    pub department_id: Option<i64>,
}

impl UpdateUserRequest {
    /// `None` leaves memberships untouched.
    pub fn departments(&self) -> Option<Vec<i64>> {
        match (&self.department_ids, self.department_id) {
            (None, None) => None,
            (ids, single) => Some(merge_departments(ids.clone().unwrap_or_default(), single)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRequest {
    pub department_ids: Vec<i64>,
}

/// A replacement grant set, either as `visibilityType` + `visibilityIds` or
/// as `departmentIds` and/or `userIds`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub visibility_type: Option<AudienceKind>,
    #[serde(default)]
    pub visibility_ids: Vec<i64>,
    #[serde(default)]
    pub department_ids: Vec<i64>,
    #[serde(default)]
    pub user_ids: Vec<i64>,
}

impl VisibilityRequest {
    pub fn is_empty(&self) -> bool {
        self.visibility_type.is_none()
            && self.visibility_ids.is_empty()
            && self.department_ids.is_empty()
            && self.user_ids.is_empty()
    }

    pub fn audience(self) -> Result<Audience, DomainError> {
        if let Some(kind) = self.visibility_type {
            return Audience::new(kind, self.visibility_ids);
        }
        Audience::mixed(self.department_ids, self.user_ids)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    #[serde(alias = "documentId", alias = "noteId")]
    pub item_id: i64,
    #[serde(flatten)]
    pub visibility: VisibilityRequest,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub title: String,
    pub content: String,
    #[serde(flatten)]
    pub visibility: VisibilityRequest,
}

#[derive(Debug, Deserialize)]
pub struct DocumentUpdateRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
    pub item_type: ItemKind,
    pub item_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub item_type: ItemKind,
    pub item_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentsResponse {
    #[serde(rename = "type")]
    pub kind: AudienceKind,
    pub departments: Vec<i64>,
    pub users: Vec<i64>,
}

impl From<Assignments> for AssignmentsResponse {
    fn from(assignments: Assignments) -> Self {
        Self {
            kind: assignments.kind(),
            departments: assignments.departments,
            users: assignments.users,
        }
    }
}

/// The grant set in the shape the edit forms send back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantsResponse {
    pub department_ids: Vec<i64>,
    pub user_ids: Vec<i64>,
}

impl From<Assignments> for GrantsResponse {
    fn from(assignments: Assignments) -> Self {
        Self { department_ids: assignments.departments, user_ids: assignments.users }
    }
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn visibility_accepts_both_shapes() {
        let typed: VisibilityRequest =
            serde_json::from_value(json!({"visibilityType": "users", "visibilityIds": [4, 4, 2]})).unwrap();
        let audience = typed.audience().unwrap();
        assert_eq!(audience.user_ids(), &[2, 4]);
        assert!(audience.department_ids().is_empty());

        let split: VisibilityRequest = serde_json::from_value(json!({"departmentIds": [3]})).unwrap();
        assert_eq!(split.audience().unwrap().department_ids(), &[3]);
    }

    #[test]
    fn visibility_rejects_empty() {
        assert!(VisibilityRequest::default().audience().is_err());
        let blank: VisibilityRequest =
            serde_json::from_value(json!({"departmentIds": [], "userIds": []})).unwrap();
        assert!(blank.audience().is_err());
    }

    #[test]
    fn split_keys_may_mix_departments_and_users() {
        let mixed: VisibilityRequest =
            serde_json::from_value(json!({"departmentIds": [3], "userIds": [4, 4]})).unwrap();
        let audience = mixed.audience().unwrap();
        assert_eq!(audience.department_ids(), &[3]);
        assert_eq!(audience.user_ids(), &[4]);
    }

    #[test]
    fn assign_request_takes_either_id_key() {
        let doc: AssignRequest = serde_json::from_value(
            json!({"documentId": 9, "visibilityType": "departments", "visibilityIds": [1]}),
        )
        .unwrap();
        assert_eq!(doc.item_id, 9);
        let note: AssignRequest =
            serde_json::from_value(json!({"noteId": 5, "userIds": [1]})).unwrap();
        assert_eq!(note.item_id, 5);
    }

    #[test]
    fn legacy_single_department_is_merged() {
        let form: CreateUserRequest = serde_json::from_value(json!({
            "first_name": "Mario", "last_name": "Rossi", "email": "m@company.com",
            "password": "pw", "department_id": 3
        }))
        .unwrap();
        assert_eq!(form.departments(), vec![3]);
        assert_eq!(form.role, Role::User);
    }

    #[test]
    fn grants_use_form_keys() {
        let body = GrantsResponse::from(Assignments { departments: vec![3], users: vec![7, 8] });
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json, json!({"departmentIds": [3], "userIds": [7, 8]}));
    }

    #[test]
    fn assignments_report_kind() {
        let body = AssignmentsResponse::from(Assignments { departments: vec![], users: vec![7] });
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(json, json!({"type": "users", "departments": [], "users": [7]}));
    }
}
