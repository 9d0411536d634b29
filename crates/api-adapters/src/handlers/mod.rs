//! # Handlers
//!
//! Thin translation between HTTP and the services: extract, call, wrap.

pub mod admin;
pub mod auth;
pub mod comments;
pub mod documents;
pub mod notes;
pub mod notifications;
pub mod system;
