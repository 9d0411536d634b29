use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use domains::{ActivityKind, ItemActivity, ItemKind, Note, NoteStats, NoteView};
use services::NoteDraft;

use crate::dto::{AssignRequest, AssignmentsResponse, GrantsResponse, NoteRequest, VisibilityRequest};
use crate::error::ApiResult;
use crate::extract::{AdminUser, AuthUser, JsonBody};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<NoteView>>> {
    Ok(Json(state.notes.list_for(user.actor()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<NoteView>> {
    Ok(Json(state.notes.get(user.actor(), id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let audience = body.visibility.audience()?;
    let draft = NoteDraft { title: body.title, content: body.content };
    let note = state.notes.create(user.actor(), draft, audience).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// Authors edit their own notes here; grants are replaced only when sent.
pub async fn update_own(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult<StatusCode> {
    let audience = if body.visibility.is_empty() {
        None
    } else {
        Some(body.visibility.audience()?)
    };
    let draft = NoteDraft { title: body.title, content: body.content };
    state.notes.update_own(user.actor(), id, draft, audience).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.notes.record_read(user.actor(), id).await?;
    state.metrics.record_activity(ItemKind::Note, ActivityKind::Read);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn grants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<GrantsResponse>> {
    Ok(Json(state.notes.grants_for(user.actor(), id).await?.into()))
}

// ---- administrators ----

pub async fn list_all(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<NoteStats>>> {
    Ok(Json(state.notes.list_all().await?))
}

pub async fn admin_create(
    State(state): State<AppState>,
    admin: AdminUser,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let audience = body.visibility.audience()?;
    let draft = NoteDraft { title: body.title, content: body.content };
    let note = state.notes.create(admin.actor(), draft, audience).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<NoteRequest>,
) -> ApiResult<StatusCode> {
    let draft = NoteDraft { title: body.title, content: body.content };
    state.notes.update(id, draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.notes.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ItemActivity>> {
    Ok(Json(state.notes.activity(id).await?))
}

pub async fn assignments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<AssignmentsResponse>> {
    Ok(Json(state.notes.assignments(id).await?.into()))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<VisibilityRequest>,
) -> ApiResult<StatusCode> {
    state.notes.set_visibility(id, body.audience()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<AssignRequest>,
) -> ApiResult<StatusCode> {
    state.notes.set_visibility(body.item_id, body.visibility.audience()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
