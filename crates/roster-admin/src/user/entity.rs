//! User Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::role::entity::Role;
use crate::role::tree::{format_to_tree, TreeNode};
use crate::shared::error::{AdminError, Result};

/// Stored user account
///
/// `password` holds the Argon2id PHC string. This struct is the storage
/// shape; anything leaving the service goes through [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: i64,

    pub name: String,

    pub email: String,

    pub password: String,

    /// Assigned roles, ascending and unique
    #[serde(default)]
    pub role_ids: Vec<i64>,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            email: normalize_email(&email.into()),
            password: password_hash.into(),
            role_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the role set wholesale.
    pub fn assign_roles(&mut self, role_ids: &[i64]) {
        self.role_ids = normalize_role_ids(role_ids);
    }

    pub fn apply(&mut self, changes: &UserChanges) {
        if let Some(name) = &changes.name {
            self.name = name.trim().to_string();
        }
        if let Some(email) = &changes.email {
            self.email = normalize_email(email);
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Fields accepted when creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Plain text; hashed by the repository
    pub password: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_email(&self.email)
    }
}

/// Partial update; `None` leaves the field alone
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserChanges {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// A user with its roles resolved
#[derive(Debug, Clone)]
pub struct UserWithRoles {
    pub user: User,
    pub roles: Vec<Role>,
}

impl UserWithRoles {
    pub fn role_ids(&self) -> Vec<i64> {
        self.roles.iter().map(|r| r.id).collect()
    }
}

/// User as returned to the admin UI
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Assigned roles in tree-select format
    pub roles: Vec<TreeNode>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserWithRoles> for UserResponse {
    fn from(u: UserWithRoles) -> Self {
        Self {
            id: u.user.id,
            name: u.user.name,
            email: u.user.email,
            roles: format_to_tree(&u.roles),
            created_at: u.user.created_at.to_rfc3339(),
            updated_at: u.user.updated_at.to_rfc3339(),
        }
    }
}

pub fn normalize_role_ids(role_ids: &[i64]) -> Vec<i64> {
    let mut ids = role_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AdminError::validation("Name is required"));
    }
    if name.chars().count() > 255 {
        return Err(AdminError::validation("Name must be at most 255 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AdminError::validation(format!("Invalid email address: {}", email)))
    }
}
