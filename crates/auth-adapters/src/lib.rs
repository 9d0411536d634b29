//! # auth-adapters
//!
//! Implementations of the `PasswordHasher` and `TokenIssuer` ports.
//! Argon2 hashing is always compiled; JWT sessions sit behind `auth-jwt`.

pub mod argon;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use argon::Argon2Hasher;
#[cfg(feature = "auth-jwt")]
pub use jwt::JwtIssuer;
