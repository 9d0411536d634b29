//! Administrator-side account management.

use std::sync::Arc;

use domains::{
    Actor, Department, DomainError, NewUser, PasswordHasher, Result, Role, User, UserRepository,
    UserUpdate,
};

use crate::{email, required};

#[derive(Debug, Clone)]
pub struct UserDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub department_ids: Vec<i64>,
}

/// Replacement values for an existing account.
/// A blank or missing password keeps the current one, as does a missing
/// role or active flag.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub department_ids: Option<Vec<i64>>,
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    /// Active accounts, used to pick direct grant targets.
    pub async fn directory(&self) -> Result<Vec<User>> {
        self.users.list_active().await
    }

    #[tracing::instrument(skip(self, draft), fields(email = %draft.email))]
    pub async fn create(&self, draft: UserDraft) -> Result<User> {
        let first_name = required("first name", &draft.first_name)?;
        let last_name = required("last name", &draft.last_name)?;
        let email = email(&draft.email)?;
        if draft.password.is_empty() {
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
                password_hash: self.hasher.hash(&draft.password)?,
                role: draft.role,
                department_ids: draft.department_ids,
            })
            .await?;
        tracing::info!(user_id = user.id, role = %user.role, "user created");
        Ok(user)
    }

    pub async fn update(&self, id: i64, changes: UserChanges) -> Result<()> {
        let first_name = required("first name", &changes.first_name)?;
        let last_name = required("last name", &changes.last_name)?;
        let email = email(&changes.email)?;

        let current = self
            .users
            .find(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        if self.users.email_taken(&email, Some(id)).await? {
            return Err(DomainError::Conflict("email already in use".into()));
        }

        let password_hash = match changes.password.filter(|p| !p.is_empty()) {
            Some(password) => Some(self.hasher.hash(&password)?),
            None => None,
        };

        self.users
            .update(
                id,
                UserUpdate {
                    first_name,
                    last_name,
                    email,
                    role: changes.role.unwrap_or(current.role),
                    is_active: changes.is_active.unwrap_or(current.is_active),
                    password_hash,
                    department_ids: changes.department_ids,
                },
            )
            .await
    }

    pub async fn delete(&self, actor: Actor, id: i64) -> Result<()> {
        if actor.id == id {
            return Err(DomainError::SelfDeletionForbidden);
        }
        if self.users.find(id).await?.is_none() {
            return Err(DomainError::not_found("user", id));
        }
        self.users.delete(id).await?;
        tracing::info!(user_id = id, by = actor.id, "user deleted");
        Ok(())
    }

    pub async fn departments_of(&self, id: i64) -> Result<Vec<Department>> {
        if self.users.find(id).await?.is_none() {
            return Err(DomainError::not_found("user", id));
        }
        self.users.departments(id).await
    }

    pub async fn set_departments(&self, id: i64, department_ids: Vec<i64>) -> Result<()> {
        if self.users.find(id).await?.is_none() {
            return Err(DomainError::not_found("user", id));
        }
        self.users.set_departments(id, department_ids).await
    }
}
