//! In-memory storage
//!
//! One store backing the user, role and permission repositories. Used by
//! tests and by the `memory` storage backend. All mutations happen under a
//! single write lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::auth::password_service::PasswordService;
use crate::permission::entity::Permission;
use crate::permission::repository::PermissionRepository;
use crate::role::entity::Role;
use crate::role::repository::{RoleOrder, RoleRepository};
use crate::shared::api_common::{Page, PageRequest};
use crate::shared::error::{AdminError, Result};
use crate::user::entity::{normalize_email, NewUser, User, UserChanges, UserWithRoles};
use crate::user::repository::{attach_roles, ensure_roles_exist, UserRepository, UserSort};

#[derive(Default)]
struct State {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    permissions: BTreeMap<i64, Permission>,
    last_user_id: i64,
    last_role_id: i64,
    last_permission_id: i64,
}

impl State {
    fn roles_for(&self, ids: &[i64]) -> Vec<Role> {
        ids.iter().filter_map(|id| self.roles.get(id).cloned()).collect()
    }

    fn check_roles(&self, role_ids: &[i64]) -> Result<()> {
        ensure_roles_exist(role_ids, &self.roles_for(role_ids))
    }

    fn check_email_free(&self, email: &str, except: Option<i64>) -> Result<()> {
        let email = normalize_email(email);
        let taken = self
            .users
            .values()
            .any(|u| u.email == email && Some(u.id) != except);
        if taken {
            Err(AdminError::duplicate("User", "email", email))
        } else {
            Ok(())
        }
    }

    fn with_roles(&self, user: &User) -> UserWithRoles {
        UserWithRoles {
            user: user.clone(),
            roles: self.roles_for(&user.role_ids),
        }
    }
}

pub struct InMemoryStore {
    state: RwLock<State>,
    passwords: Arc<PasswordService>,
}

impl InMemoryStore {
    pub fn new(passwords: Arc<PasswordService>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            passwords,
        }
    }

    pub fn insert_role(&self, name: &str, description: Option<&str>) -> Role {
        let mut state = self.state.write();
        state.last_role_id += 1;
        let mut role = Role::new(state.last_role_id, name);
        role.description = description.map(str::to_string);
        state.roles.insert(role.id, role.clone());
        role
    }

    pub fn insert_permission(&self, name: &str, description: Option<&str>) -> Permission {
        let mut state = self.state.write();
        state.last_permission_id += 1;
        let mut permission = Permission::new(state.last_permission_id, name);
        permission.description = description.map(str::to_string);
        state.permissions.insert(permission.id, permission.clone());
        permission
    }

    pub fn find_role_by_name(&self, name: &str) -> Option<Role> {
        self.state.read().roles.values().find(|r| r.name == name).cloned()
    }

    pub fn find_permission_by_name(&self, name: &str) -> Option<Permission> {
        self.state.read().permissions.values().find(|p| p.name == name).cloned()
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email);
        self.state.read().users.values().find(|u| u.email == email).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.state.read().users.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn paginate(&self, page: PageRequest, sort: UserSort) -> Result<Page<UserWithRoles>> {
        let state = self.state.read();
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by(|a, b| sort.compare(a, b));

        let items: Vec<User> = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .cloned()
            .collect();
        let roles: Vec<Role> = state.roles.values().cloned().collect();

        Ok(Page::new(attach_roles(items, &roles), state.users.len() as u64))
    }

    async fn find(&self, id: i64) -> Result<UserWithRoles> {
        let state = self.state.read();
        state
            .users
            .get(&id)
            .map(|u| state.with_roles(u))
            .ok_or_else(|| AdminError::not_found("User", id))
    }

    async fn create(&self, new_user: NewUser, role_ids: &[i64]) -> Result<User> {
        new_user.validate()?;
        {
            let state = self.state.read();
            state.check_email_free(&new_user.email, None)?;
            state.check_roles(role_ids)?;
        }

        let hash = self.passwords.hash_password(&new_user.password)?;

        let mut state = self.state.write();
        // Re-check under the write lock; hashing ran unlocked.
        state.check_email_free(&new_user.email, None)?;
        state.check_roles(role_ids)?;

        state.last_user_id += 1;
        let mut user = User::new(state.last_user_id, new_user.name.trim(), &new_user.email, hash);
        user.assign_roles(role_ids);
        state.users.insert(user.id, user.clone());

        info!(user_id = user.id, roles = ?user.role_ids, "Created user");
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges, role_ids: &[i64]) -> Result<User> {
        changes.validate()?;
        let mut state = self.state.write();

        if !state.users.contains_key(&id) {
            return Err(AdminError::not_found("User", id));
        }
        if let Some(email) = &changes.email {
            state.check_email_free(email, Some(id))?;
        }
        state.check_roles(role_ids)?;

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AdminError::not_found("User", id))?;
        user.apply(&changes);
        user.assign_roles(role_ids);
        user.touch();

        info!(user_id = id, roles = ?user.role_ids, "Updated user");
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password: &str) -> Result<()> {
        if !self.state.read().users.contains_key(&id) {
            return Err(AdminError::not_found("User", id));
        }
        let hash = self.passwords.hash_password(password)?;

        let mut state = self.state.write();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| AdminError::not_found("User", id))?;
        user.password = hash;
        user.touch();

        info!(user_id = id, "Updated user password");
        Ok(())
    }

    async fn destroy(&self, id: i64) -> Result<()> {
        self.state
            .write()
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AdminError::not_found("User", id))
    }
}

#[async_trait]
impl RoleRepository for InMemoryStore {
    async fn list_all(&self, order: RoleOrder) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.state.read().roles.values().cloned().collect();
        order.sort(&mut roles);
        Ok(roles)
    }
}

#[async_trait]
impl PermissionRepository for InMemoryStore {
    async fn list_all(&self) -> Result<Vec<Permission>> {
        Ok(self.state.read().permissions.values().cloned().collect())
    }
}
