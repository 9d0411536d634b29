use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use domains::{DepartmentSummary, User};
use services::{ProfileChanges, Registration, Session};

use crate::dto::{LoginRequest, ProfileRequest, RegisterRequest};
use crate::error::ApiResult;
use crate::extract::{AuthUser, JsonBody};
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Json<Session>> {
    let result = state.auth.login(&body.email, &body.password).await;
    state.metrics.record_login(result.is_ok());
    Ok(Json(result?))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let department_ids = body.departments();
    let session = state
        .auth
        .register(Registration {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            password: body.password,
            department_ids,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Public: the registration form lists departments before sign-in.
pub async fn departments(State(state): State<AppState>) -> ApiResult<Json<Vec<DepartmentSummary>>> {
    Ok(Json(state.departments.list().await?))
}

/// Active colleagues, for picking direct grant targets.
pub async fn directory(State(state): State<AppState>, _user: AuthUser) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.users.directory().await?))
}

pub async fn profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(state.auth.profile(user.actor()).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(body): JsonBody<ProfileRequest>,
) -> ApiResult<StatusCode> {
    state
        .auth
        .update_profile(
            user.actor(),
            ProfileChanges {
                first_name: body.first_name,
                last_name: body.last_name,
                email: body.email,
                current_password: body.current_password,
                new_password: body.new_password,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
