//! Credential checks, session issuance and the caller's own profile.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use domains::{
    Actor, DomainError, NewUser, PasswordHasher, Result, Role, SessionClaims, TokenIssuer, User,
    UserRepository, UserUpdate,
};

use crate::{email, required};

/// A freshly minted session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Self-registration form. The resulting account is always a plain user.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub department_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        Self { users, hasher, tokens }
    }

    /// Unknown email and wrong password both yield `InvalidCredentials`.
    /// `AccountInactive` is only reported once the password matched.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(DomainError::validation("email and password are required"));
        }

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash) {
            tracing::warn!(user_id = user.id, "password mismatch");
            return Err(DomainError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(DomainError::AccountInactive);
        }

        let issued = self.tokens.issue(&user)?;
        self.users.touch_last_access(user.id).await?;
        tracing::info!(user_id = user.id, role = %user.role, "login");

        Ok(Session { token: issued.token, expires_at: issued.expires_at, user })
    }

    #[tracing::instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: Registration) -> Result<Session> {
        let first_name = required("first name", &form.first_name)?;
        let last_name = required("last name", &form.last_name)?;
        let email = email(&form.email)?;
        if form.password.is_empty() {
            return Err(DomainError::validation("password is required"));
        }

        if self.users.email_taken(&email, None).await? {
            return Err(DomainError::Conflict("user already exists".into()));
        }

        let user = self
            .users
            .create(NewUser {
                first_name,
                last_name,
                email,
                password_hash: self.hasher.hash(&form.password)?,
                role: Role::User,
                department_ids: form.department_ids,
            })
            .await?;

        let issued = self.tokens.issue(&user)?;
        tracing::info!(user_id = user.id, "registered");
        Ok(Session { token: issued.token, expires_at: issued.expires_at, user })
    }

    /// Verifies a bearer token and, when `required` is set, the role it carries.
    pub fn authorize(&self, token: Option<&str>, required: Option<Role>) -> Result<SessionClaims> {
        let token = token.ok_or(DomainError::MissingToken)?;
        let claims = self.tokens.verify(token)?;
        if let Some(role) = required {
            if claims.role != role {
                return Err(DomainError::InsufficientRole);
            }
        }
        Ok(claims)
    }

    pub async fn profile(&self, actor: Actor) -> Result<User> {
        self.users
            .find(actor.id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", actor.id))
    }

    #[tracing::instrument(skip(self, changes), fields(user_id = actor.id))]
    pub async fn update_profile(&self, actor: Actor, changes: ProfileChanges) -> Result<()> {
        let first_name = required("first name", &changes.first_name)?;
        let last_name = required("last name", &changes.last_name)?;
        let email = email(&changes.email)?;

        if self.users.email_taken(&email, Some(actor.id)).await? {
            return Err(DomainError::Conflict("email already in use".into()));
        }

        let user = self.profile(actor).await?;

        let password_hash = match changes.new_password.filter(|p| !p.is_empty()) {
            None => None,
            Some(new_password) => {
                let current = changes
                    .current_password
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| DomainError::validation("current password is required"))?;
                if !self.hasher.verify(&current, &user.password_hash) {
                    return Err(DomainError::InvalidCredentials);
                }
                Some(self.hasher.hash(&new_password)?)
            }
        };

        self.users
            .update(
                actor.id,
                UserUpdate {
                    first_name,
                    last_name,
                    email,
                    role: user.role,
                    is_active: user.is_active,
                    password_hash,
                    department_ids: None,
                },
            )
            .await
    }
}
