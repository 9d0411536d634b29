//! Department, account and audit-log management. Administrators only.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;

use domains::{AuditEntry, Department, DepartmentSummary, LogFilter, User};
use services::{UserChanges, UserDraft};

use crate::dto::{CreateUserRequest, DepartmentRequest, LogsQuery, MembershipRequest, UpdateUserRequest};
use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, JsonBody};
use crate::state::AppState;

// ---- departments ----

pub async fn departments(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<DepartmentSummary>>> {
    Ok(Json(state.departments.list().await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<DepartmentRequest>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    let department = state.departments.create(&body.name, body.description).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn rename_department(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<DepartmentRequest>,
) -> ApiResult<StatusCode> {
    state.departments.rename(id, &body.name, body.description).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_department(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.departments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- users ----

pub async fn users(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let department_ids = body.departments();
    let user = state
        .users
        .create(UserDraft {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            password: body.password,
            role: body.role,
            department_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<UpdateUserRequest>,
) -> ApiResult<StatusCode> {
    let department_ids = body.departments();
    state
        .users
        .update(
            id,
            UserChanges {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                password: body.password,
                role: body.role,
                is_active: body.is_active,
                department_ids,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.users.delete(admin.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn user_departments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(state.users.departments_of(id).await?))
}

pub async fn set_user_departments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<MembershipRequest>,
) -> ApiResult<StatusCode> {
    state.users.set_departments(id, body.department_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- audit log ----

pub async fn logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let filter = match query.kind.as_deref() {
        None | Some("") => LogFilter::All,
        Some(raw) => raw.parse()?,
    };
    Ok(Json(state.audit.log(filter).await?))
}
