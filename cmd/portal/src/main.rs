//! # Portal binary
//!
//! Reads the settings, builds every adapter once and serves the HTTP API.
//! The portal requires `web-axum`, `db-postgres` and `auth-jwt`; the storage
//! backend is chosen at runtime among the compiled ones.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use api_adapters::{router, AppState, Metrics, Ports, RouterOptions, StaticUploads};
use auth_adapters::{Argon2Hasher, JwtIssuer};
use configs::{LoggingSettings, Settings, StorageBackend};
use domains::FileStorage;
use storage_adapters::postgres::{
    self, PgActivityRepository, PgCommentRepository, PgDepartmentRepository, PgDocumentRepository,
    PgNoteRepository, PgNotificationRepository, PgUserRepository, PgVisibilityRepository,
};

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Picks the storage adapter for the configured backend, plus the directory
/// to serve publicly when files live on this host.
fn file_storage(settings: &Settings) -> anyhow::Result<(Arc<dyn FileStorage>, Option<StaticUploads>)> {
    match settings.storage.backend {
        #[cfg(feature = "media-local")]
        StorageBackend::Local => {
            let local = &settings.storage.local;
            let storage = storage_adapters::LocalFileStorage::new(&local.root, &local.public_url);
            let uploads = StaticUploads {
                prefix: local.public_url.clone(),
                dir: PathBuf::from(&local.root),
            };
            Ok((Arc::new(storage), Some(uploads)))
        }
        #[cfg(feature = "media-ftp")]
        StorageBackend::Ftp => {
            let ftp = settings
                .storage
                .ftp
                .as_ref()
                .context("storage.ftp settings are missing")?;
            let storage = storage_adapters::FtpFileStorage::new(storage_adapters::FtpConfig {
                host: ftp.host.clone(),
                port: ftp.port,
                user: ftp.user.clone(),
                password: ftp.password.expose_secret().to_string(),
                remote_dir: ftp.remote_dir.clone(),
                public_url: ftp.public_url.clone(),
            });
            Ok((Arc::new(storage), None))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("storage backend {other:?} is not compiled into this binary"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.logging);

    // 1. Database
    let pool = postgres::connect(settings.database.url.expose_secret(), settings.database.max_connections)
        .await
        .context("connecting to PostgreSQL")?;
    if settings.database.run_migrations {
        postgres::run_migrations(&pool).await.context("running migrations")?;
        tracing::info!("migrations applied");
    }

    // 2. File storage
    let (storage, uploads) = file_storage(&settings)?;

    // 3. Authentication
    let tokens = JwtIssuer::new(settings.auth.jwt_secret.expose_secret(), settings.auth.token_ttl_hours);

    // 4. Wire ports into services
    let ports = Ports {
        departments: Arc::new(PgDepartmentRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool.clone())),
        documents: Arc::new(PgDocumentRepository::new(pool.clone())),
        notes: Arc::new(PgNoteRepository::new(pool.clone())),
        visibility: Arc::new(PgVisibilityRepository::new(pool.clone())),
        activity: Arc::new(PgActivityRepository::new(pool.clone())),
        comments: Arc::new(PgCommentRepository::new(pool.clone())),
        notifications: Arc::new(PgNotificationRepository::new(pool)),
        storage,
        hasher: Arc::new(Argon2Hasher::new()),
        tokens: Arc::new(tokens),
    };
    let state = AppState::new(ports, Arc::new(Metrics::new()));

    let app = router(
        state,
        RouterOptions {
            max_upload_bytes: settings.server.max_upload_bytes,
            cors_origins: settings.server.cors_origins.clone(),
            uploads,
        },
    );

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(%address, backend = ?settings.storage.backend, "portal listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    Ok(())
}
