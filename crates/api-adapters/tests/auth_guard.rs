use std::sync::Arc;

use api_adapters::{router, AppState, Metrics, Ports, RouterOptions};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use domains::{
    DomainError, MockActivityRepository, MockCommentRepository, MockDepartmentRepository,
    MockDocumentRepository, MockFileStorage, MockNoteRepository, MockNotificationRepository,
    MockPasswordHasher, MockTokenIssuer, MockUserRepository, MockVisibilityRepository, Role,
    SessionClaims,
};
use tower::ServiceExt;

fn claims(role: Role) -> SessionClaims {
    SessionClaims {
        sub: 7,
        email: "anna.verdi@company.com".into(),
        role,
        departments: vec![1],
        iat: 0,
        exp: i64::MAX,
    }
}

fn app(departments: MockDepartmentRepository) -> axum::Router {
    let mut tokens = MockTokenIssuer::new();
    tokens.expect_verify().returning(|token| match token {
        "admin-token" => Ok(claims(Role::Administrator)),
        "user-token" => Ok(claims(Role::User)),
        _ => Err(DomainError::InvalidToken),
    });

    let ports = Ports {
        departments: Arc::new(departments),
        users: Arc::new(MockUserRepository::new()),
        documents: Arc::new(MockDocumentRepository::new()),
        notes: Arc::new(MockNoteRepository::new()),
        visibility: Arc::new(MockVisibilityRepository::new()),
        activity: Arc::new(MockActivityRepository::new()),
        comments: Arc::new(MockCommentRepository::new()),
        notifications: Arc::new(MockNotificationRepository::new()),
        storage: Arc::new(MockFileStorage::new()),
        hasher: Arc::new(MockPasswordHasher::new()),
        tokens: Arc::new(tokens),
    };
    router(AppState::new(ports, Arc::new(Metrics::new())), RouterOptions::default())
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app(MockDepartmentRepository::new()).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let response = app(MockDepartmentRepository::new())
        .oneshot(get("/api/documents", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(json_body(response).await["error"].is_string());
}

#[tokio::test]
async fn garbage_token_is_unauthorized() {
    let response = app(MockDepartmentRepository::new())
        .oneshot(get("/api/notifications", Some("not-a-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_cannot_reach_admin_routes() {
    let mut departments = MockDepartmentRepository::new();
    departments.expect_list().never();

    let response = app(departments)
        .oneshot(get("/api/admin/departments", Some("user-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn administrators_reach_admin_routes() {
    let mut departments = MockDepartmentRepository::new();
    departments.expect_list().times(1).returning(|| Ok(vec![]));

    let response = app(departments)
        .oneshot(get("/api/admin/departments", Some("admin-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn malformed_comment_query_is_bad_request() {
    let response = app(MockDepartmentRepository::new())
        .oneshot(get("/api/comments?itemType=poster&itemId=1", Some("user-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_log_type_is_bad_request() {
    let response = app(MockDepartmentRepository::new())
        .oneshot(get("/api/admin/logs?type=everything", Some("admin-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let response = app(MockDepartmentRepository::new()).oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
