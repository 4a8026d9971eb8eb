//! Development Data Seeder
//!
//! Seeds roles, permissions and an administrator when running with
//! `dev_mode`. Existing records are left untouched.
//!
//! Default login: admin@roster.local / DevPassword123!

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::Database;
use tracing::info;

use crate::auth::password_service::PasswordService;
use crate::permission::repository::MongoPermissionRepository;
use crate::role::entity::Role;
use crate::role::repository::MongoRoleRepository;
use crate::shared::error::Result;
use crate::shared::memory_store::InMemoryStore;
use crate::user::entity::NewUser;
use crate::user::repository::{MongoUserRepository, UserRepository};

const DEV_PASSWORD: &str = "DevPassword123!";
const DEV_ADMIN_EMAIL: &str = "admin@roster.local";

const DEV_ROLES: &[(&str, &str)] = &[
    ("Administrator", "Full access to the admin"),
    ("Editor", "Manages content"),
    ("Viewer", "Read-only access"),
];

const DEV_PERMISSIONS: &[(&str, &str)] = &[
    ("users.manage", "Create, edit and delete users"),
    ("roles.view", "See roles and their assignments"),
];

/// Lookups and inserts the seeder needs beyond [`UserRepository`].
#[async_trait]
pub trait SeedStore: Send + Sync {
    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role>;
    async fn ensure_permission(&self, name: &str, description: &str) -> Result<()>;
    async fn user_exists(&self, email: &str) -> Result<bool>;
}

pub struct MongoSeedStore {
    roles: MongoRoleRepository,
    permissions: MongoPermissionRepository,
    users: MongoUserRepository,
}

impl MongoSeedStore {
    pub fn new(db: &Database, passwords: Arc<PasswordService>) -> Self {
        Self {
            roles: MongoRoleRepository::new(db),
            permissions: MongoPermissionRepository::new(db),
            users: MongoUserRepository::new(db, passwords),
        }
    }
}

#[async_trait]
impl SeedStore for MongoSeedStore {
    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role> {
        if let Some(role) = self.roles.find_by_name(name).await? {
            return Ok(role);
        }
        let role = self.roles.create(name, Some(description)).await?;
        info!("Created role: {} ({})", role.name, role.id);
        Ok(role)
    }

    async fn ensure_permission(&self, name: &str, description: &str) -> Result<()> {
        if self.permissions.find_by_name(name).await?.is_none() {
            self.permissions.create(name, Some(description)).await?;
            info!("Created permission: {}", name);
        }
        Ok(())
    }

    async fn user_exists(&self, email: &str) -> Result<bool> {
        Ok(self.users.find_by_email(email).await?.is_some())
    }
}

#[async_trait]
impl SeedStore for InMemoryStore {
    async fn ensure_role(&self, name: &str, description: &str) -> Result<Role> {
        if let Some(role) = self.find_role_by_name(name) {
            return Ok(role);
        }
        let role = self.insert_role(name, Some(description));
        info!("Created role: {} ({})", role.name, role.id);
        Ok(role)
    }

    async fn ensure_permission(&self, name: &str, description: &str) -> Result<()> {
        if self.find_permission_by_name(name).is_none() {
            self.insert_permission(name, Some(description));
            info!("Created permission: {}", name);
        }
        Ok(())
    }

    async fn user_exists(&self, email: &str) -> Result<bool> {
        Ok(self.find_user_by_email(email).is_some())
    }
}

pub struct DevDataSeeder {
    store: Arc<dyn SeedStore>,
    users: Arc<dyn UserRepository>,
}

impl DevDataSeeder {
    pub fn new(store: Arc<dyn SeedStore>, users: Arc<dyn UserRepository>) -> Self {
        Self { store, users }
    }

    pub async fn seed(&self) -> Result<()> {
        info!("=== DEV DATA SEEDER ===");

        let mut roles = Vec::with_capacity(DEV_ROLES.len());
        for (name, description) in DEV_ROLES {
            roles.push(self.store.ensure_role(name, description).await?);
        }
        for (name, description) in DEV_PERMISSIONS {
            self.store.ensure_permission(name, description).await?;
        }

        if !self.store.user_exists(DEV_ADMIN_EMAIL).await? {
            let admin_roles: Vec<i64> = roles
                .iter()
                .filter(|r| r.name == "Administrator")
                .map(|r| r.id)
                .collect();
            let user = self
                .users
                .create(NewUser::new("Administrator", DEV_ADMIN_EMAIL, DEV_PASSWORD), &admin_roles)
                .await?;
            info!("Created user: {} ({})", user.email, user.id);
        }

        info!("Default login: {} / {}", DEV_ADMIN_EMAIL, DEV_PASSWORD);
        info!("=======================");
        Ok(())
    }
}
