use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::Json;

use domains::{
    ActivityKind, Actor, Audience, AudienceKind, Document, DocumentStats, DocumentView, ItemActivity,
    ItemKind,
};
use services::DocumentUpload;

use crate::dto::{
    AssignRequest, AssignmentsResponse, DocumentUpdateRequest, DownloadResponse, GrantsResponse,
    VisibilityRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, AuthUser, JsonBody};
use crate::state::AppState;

fn id_list(field: &str, raw: &str) -> ApiResult<Vec<i64>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|_| ApiError::bad_request(format!("{field} must be a JSON array of ids")))
}

/// Reads `title`, `description`, `file` and the grant fields of an upload form.
async fn read_upload(mut multipart: Multipart) -> ApiResult<(DocumentUpload, Audience)> {
    let mut title = String::new();
    let mut description = None;
    let mut file = None;
    let mut visibility = VisibilityRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .and_then(|ct| ct.parse::<mime::Mime>().ok())
                    .unwrap_or(mime::APPLICATION_OCTET_STREAM);
                let data = field.bytes().await.map_err(|err| ApiError::bad_request(err.body_text()))?;
                file = Some((file_name, content_type, data));
            }
            other => {
                let text = field.text().await.map_err(|err| ApiError::bad_request(err.body_text()))?;
                match other {
                    "title" => title = text,
                    "description" => description = Some(text),
                    "visibilityType" => {
                        visibility.visibility_type = Some(match text.as_str() {
                            "departments" => AudienceKind::Departments,
                            "users" => AudienceKind::Users,
                            _ => return Err(ApiError::bad_request("visibilityType must be 'departments' or 'users'")),
                        })
                    }
                    "visibilityIds" => visibility.visibility_ids = id_list(other, &text)?,
                    "departmentIds" => visibility.department_ids = id_list(other, &text)?,
                    "userIds" => visibility.user_ids = id_list(other, &text)?,
                    _ => tracing::debug!(field = other, "ignoring unknown form field"),
                }
            }
        }
    }

    let (file_name, content_type, data) = file.ok_or_else(|| ApiError::bad_request("file is required"))?;
    let audience = visibility.audience()?;
    Ok((DocumentUpload { title, description, file_name, content_type, data }, audience))
}

// ---- signed-in users ----

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<DocumentView>>> {
    Ok(Json(state.documents.list_for(user.actor()).await?))
}

pub async fn get(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocumentView>> {
    Ok(Json(state.documents.get(user.actor(), id).await?))
}

pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    publish(state, user.actor(), multipart).await
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.documents.record_read(user.actor(), id).await?;
    state.metrics.record_activity(ItemKind::Document, ActivityKind::Read);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = state.documents.record_download(user.actor(), id).await?;
    state.metrics.record_activity(ItemKind::Document, ActivityKind::Download);
    Ok(Json(DownloadResponse { url }))
}

/// Logs a download and redirects to where the file is served.
pub async fn file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Redirect> {
    let url = state.documents.record_download(user.actor(), id).await?;
    state.metrics.record_activity(ItemKind::Document, ActivityKind::Download);
    Ok(Redirect::temporary(&url))
}

pub async fn grants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<GrantsResponse>> {
    Ok(Json(state.documents.grants_for(user.actor(), id).await?.into()))
}

// ---- administrators ----

pub async fn list_all(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Json<Vec<DocumentStats>>> {
    Ok(Json(state.documents.list_all().await?))
}

pub async fn create(
    State(state): State<AppState>,
    admin: AdminUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    publish(state, admin.actor(), multipart).await
}

async fn publish(
    state: AppState,
    actor: Actor,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let (upload, audience) = read_upload(multipart).await?;
    let document = state.documents.create(actor, upload, audience).await?;
    state.metrics.record_upload();
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<DocumentUpdateRequest>,
) -> ApiResult<StatusCode> {
    state.documents.update(id, &body.title, body.description).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.documents.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activity(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<ItemActivity>> {
    Ok(Json(state.documents.activity(id).await?))
}

pub async fn assignments(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<AssignmentsResponse>> {
    Ok(Json(state.documents.assignments(id).await?.into()))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<VisibilityRequest>,
) -> ApiResult<StatusCode> {
    state.documents.set_visibility(id, body.audience()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(body): JsonBody<AssignRequest>,
) -> ApiResult<StatusCode> {
    state.documents.set_visibility(body.item_id, body.visibility.audience()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
