use std::path::PathBuf;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, auth, comments, documents, notes, notifications, system};
use crate::state::AppState;

/// Transport settings the router needs from the binary's configuration.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub max_upload_bytes: usize,
    /// Allowed browser origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
    /// Serve uploaded files from `dir` under `prefix` (local storage only).
    pub uploads: Option<StaticUploads>,
}

#[derive(Debug, Clone)]
pub struct StaticUploads {
    pub prefix: String,
    pub dir: PathBuf,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { max_upload_bytes: 50 * 1024 * 1024, cors_origins: Vec::new(), uploads: None }
    }
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/departments", get(auth::departments))
        .route("/users", get(auth::directory))
        .route("/user/profile", get(auth::profile).put(auth::update_profile))
        .route("/documents", get(documents::list).post(documents::upload))
        .route("/documents/{id}", get(documents::get))
        .route("/documents/{id}/read", post(documents::mark_read))
        .route("/documents/{id}/download", post(documents::download))
        .route("/documents/{id}/file", get(documents::file))
        .route("/documents/{id}/visibility", get(documents::grants))
        .route("/notes", get(notes::list).post(notes::create))
        .route("/notes/{id}", get(notes::get).put(notes::update_own))
        .route("/notes/{id}/read", post(notes::mark_read))
        .route("/notes/{id}/visibility", get(notes::grants))
        .route("/comments", get(comments::list).post(comments::add))
        .route("/notifications", get(notifications::list))
        .route("/notifications/{id}/read", post(notifications::mark_read))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/departments", get(admin::departments).post(admin::create_department))
        .route(
            "/departments/{id}",
            put(admin::rename_department).delete(admin::delete_department),
        )
        .route("/users", get(admin::users).post(admin::create_user))
        .route("/users/{id}", put(admin::update_user).delete(admin::delete_user))
        .route(
            "/users/{id}/departments",
            get(admin::user_departments).put(admin::set_user_departments),
        )
        .route("/documents", get(documents::list_all).post(documents::create))
        .route("/documents/assign", post(documents::assign))
        .route("/documents/{id}", put(documents::update).delete(documents::delete))
        .route("/documents/{id}/activity", get(documents::activity))
        .route("/documents/{id}/assignments", get(documents::assignments))
        .route("/documents/{id}/visibility", put(documents::set_visibility))
        .route("/notes", get(notes::list_all).post(notes::admin_create))
        .route("/notes/assign", post(notes::assign))
        .route("/notes/{id}", put(notes::update).delete(notes::delete))
        .route("/notes/{id}/activity", get(notes::activity))
        .route("/notes/{id}/assignments", get(notes::assignments))
        .route("/notes/{id}/visibility", put(notes::set_visibility))
        .route("/logs", get(admin::logs))
}

/// Builds the complete HTTP application.
pub fn router(state: AppState, options: RouterOptions) -> Router {
    let mut app = Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .nest("/api", user_routes().nest("/admin", admin_routes()));

    if let Some(uploads) = options.uploads {
        app = app.nest_service(&uploads.prefix, ServeDir::new(uploads.dir));
    }

    app.layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&options.cors_origins))
        .with_state(state)
}
