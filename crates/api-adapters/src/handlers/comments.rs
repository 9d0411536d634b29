use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use domains::Comment;

use crate::dto::{CommentQuery, CommentRequest, CreatedResponse};
use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, JsonBody};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<CommentQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let Query(query) = query.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    Ok(Json(state.comments.list(user.actor(), query.item_type, query.item_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<CommentRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let id = state
        .comments
        .add(user.actor(), body.item_type, body.item_id, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
