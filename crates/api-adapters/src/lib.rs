//! # api-adapters
//!
//! HTTP surface of the portal. The axum router, extractors and handlers are
//! compiled with `web-axum`; the Prometheus registry is always available.

pub mod metrics;

#[cfg(feature = "web-axum")]
mod dto;
#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
mod handlers;
#[cfg(feature = "web-axum")]
mod router;
#[cfg(feature = "web-axum")]
mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use extract::{AdminUser, AuthUser};
#[cfg(feature = "web-axum")]
pub use router::{router, RouterOptions, StaticUploads};
#[cfg(feature = "web-axum")]
pub use state::{AppState, Ports};
