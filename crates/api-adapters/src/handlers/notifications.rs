use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use domains::Notification;

use crate::error::ApiResult;
use crate::extract::AuthUser;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.notifications.list(user.actor()).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.notifications.mark_read(user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
