//! # integration-tests
//!
//! Drives the full axum router over in-memory adapters. Services, extractors
//! and JWT sessions are the production ones; only storage is swapped out.

pub mod memory;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use serde_json::Value;
use tower::ServiceExt;

use api_adapters::{router, AppState, Metrics, Ports, RouterOptions};
use auth_adapters::JwtIssuer;
use domains::{NewUser, PasswordHasher, Role, TokenIssuer};

pub use memory::{MemoryFiles, MemoryStore, PlainHasher};

pub const PASSWORD: &str = "correct horse";
const SECRET: &str = "integration-test-secret";
const BOUNDARY: &str = "portal-test-boundary";

/// A signed-in account created directly in the store.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub token: String,
}

pub struct TestApp {
    pub store: MemoryStore,
    pub files: MemoryFiles,
    router: Router,
    tokens: Arc<JwtIssuer>,
    accounts: AtomicUsize,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let files = MemoryFiles::default();
        let tokens = Arc::new(JwtIssuer::new(SECRET, 1));
        let shared = Arc::new(store.clone());

        let ports = Ports {
            departments: shared.clone(),
            users: shared.clone(),
            documents: shared.clone(),
            notes: shared.clone(),
            visibility: shared.clone(),
            activity: shared.clone(),
            comments: shared.clone(),
            notifications: shared,
            storage: Arc::new(files.clone()),
            hasher: Arc::new(PlainHasher),
            tokens: tokens.clone(),
        };
        let router = router(AppState::new(ports, Arc::new(Metrics::new())), RouterOptions::default());
        Self { store, files, router, tokens, accounts: AtomicUsize::new(0) }
    }

    pub fn department(&self, name: &str) -> i64 {
        self.store.insert_department(name)
    }

    /// Creates an account with a random name and returns a live session for it.
    pub fn account(&self, role: Role, departments: &[i64]) -> Account {
        let first_name: String = FirstName().fake();
        let last_name: String = LastName().fake();
        let n = self.accounts.fetch_add(1, Ordering::Relaxed) + 1;
        let email = format!("employee{n}@company.com");
        let user = self.store.insert_user(NewUser {
            first_name,
            last_name,
            email: email.clone(),
            password_hash: PlainHasher.hash(PASSWORD).unwrap(),
            role,
            department_ids: departments.to_vec(),
        });
        let token = self.tokens.issue(&user).unwrap().token;
        Account { id: user.id, email, token }
    }

    pub fn admin(&self) -> Account {
        self.account(Role::Administrator, &[])
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Posts a multipart upload with the given text fields and one file.
    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some((file_name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Uploads a small PDF visible to `departments` and returns its id.
    pub async fn document_for_departments(&self, token: &str, title: &str, departments: &[i64]) -> i64 {
        let ids = serde_json::to_string(departments).unwrap();
        let (status, body) = self
            .upload(
                "/api/admin/documents",
                token,
                &[("title", title), ("visibilityType", "departments"), ("visibilityIds", ids.as_str())],
                Some(("plan.pdf", &b"%PDF-1.4 test"[..])),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }
}
