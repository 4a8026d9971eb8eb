//! User Repository
//!
//! Users embed their role assignments as `roleIds`, so replacing a user's
//! roles is a single-document write.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use tracing::{debug, info};

use crate::auth::password_service::PasswordService;
use crate::role::entity::Role;
use crate::shared::api_common::{Page, PageRequest, SortDirection};
use crate::shared::error::{AdminError, Result};
use crate::shared::sequence::IdSequence;
use crate::user::entity::{normalize_email, normalize_role_ids, NewUser, User, UserChanges, UserWithRoles};

/// Columns the listing may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    #[default]
    Id,
    Name,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl UserSortField {
    /// Unknown or missing fields sort by id.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim).unwrap_or_default() {
            "name" => Self::Name,
            "email" => Self::Email,
            "created_at" | "createdAt" => Self::CreatedAt,
            "updated_at" | "updatedAt" => Self::UpdatedAt,
            _ => Self::Id,
        }
    }

    fn mongo_field(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UserSort {
    pub field: UserSortField,
    pub direction: SortDirection,
}

impl UserSort {
    pub fn new(field: UserSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    fn mongo_sort(&self) -> Document {
        let mut sort = Document::new();
        sort.insert(self.field.mongo_field(), self.direction.as_i32());
        sort.insert("_id", self.direction.as_i32());
        sort
    }

    /// Comparator matching `mongo_sort`, ties broken by id.
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        let ordering = match self.field {
            UserSortField::Id => Ordering::Equal,
            UserSortField::Name => a.name.cmp(&b.name),
            UserSortField::Email => a.email.cmp(&b.email),
            UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            UserSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
        .then(a.id.cmp(&b.id));

        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn paginate(&self, page: PageRequest, sort: UserSort) -> Result<Page<UserWithRoles>>;

    async fn find(&self, id: i64) -> Result<UserWithRoles>;

    /// Create a user holding exactly `role_ids`.
    async fn create(&self, user: NewUser, role_ids: &[i64]) -> Result<User>;

    /// Apply `changes` and replace the role set with `role_ids`.
    async fn update(&self, id: i64, changes: UserChanges, role_ids: &[i64]) -> Result<User>;

    async fn update_password(&self, id: i64, password: &str) -> Result<()>;

    async fn destroy(&self, id: i64) -> Result<()>;
}

/// Fails unless every requested id is among `known`.
pub(crate) fn ensure_roles_exist(requested: &[i64], known: &[Role]) -> Result<()> {
    let known: HashSet<i64> = known.iter().map(|r| r.id).collect();
    let missing: Vec<String> = normalize_role_ids(requested)
        .into_iter()
        .filter(|id| !known.contains(id))
        .map(|id| id.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AdminError::validation(format!("Unknown role id(s): {}", missing.join(", "))))
    }
}

/// Pair each user with its roles, keeping the roles in id order.
pub(crate) fn attach_roles(users: Vec<User>, roles: &[Role]) -> Vec<UserWithRoles> {
    let by_id: HashMap<i64, &Role> = roles.iter().map(|r| (r.id, r)).collect();
    users
        .into_iter()
        .map(|user| {
            let roles = user
                .role_ids
                .iter()
                .filter_map(|id| by_id.get(id).map(|r| (*r).clone()))
                .collect();
            UserWithRoles { user, roles }
        })
        .collect()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref e)) if e.code == 11000
    )
}

pub struct MongoUserRepository {
    collection: Collection<User>,
    roles: Collection<Role>,
    sequence: IdSequence,
    passwords: Arc<PasswordService>,
}

impl MongoUserRepository {
    pub fn new(db: &Database, passwords: Arc<PasswordService>) -> Self {
        Self {
            collection: db.collection("users"),
            roles: db.collection("roles"),
            sequence: IdSequence::new(db),
            passwords,
        }
    }

    /// Unique email index; safe to call on every start.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index).await?;
        info!("User indexes ensured");
        Ok(())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .collection
            .find_one(doc! { "email": normalize_email(email) })
            .await?)
    }

    async fn roles_by_ids(&self, ids: &[i64]) -> Result<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .roles
            .find(doc! { "_id": { "$in": ids } })
            .sort(doc! { "_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn check_roles(&self, role_ids: &[i64]) -> Result<()> {
        let ids = normalize_role_ids(role_ids);
        let known = self.roles_by_ids(&ids).await?;
        ensure_roles_exist(&ids, &known)
    }

    async fn check_email_free(&self, email: &str, except: Option<i64>) -> Result<()> {
        match self.find_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => {
                Err(AdminError::duplicate("User", "email", normalize_email(email)))
            }
            _ => Ok(()),
        }
    }

    async fn load(&self, id: i64) -> Result<User> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or_else(|| AdminError::not_found("User", id))
    }

    async fn replace(&self, user: &User) -> Result<()> {
        let result = self
            .collection
            .replace_one(doc! { "_id": user.id }, user)
            .await
            .map_err(|e| self.map_write_error(e, &user.email))?;

        if result.matched_count == 0 {
            return Err(AdminError::not_found("User", user.id));
        }
        Ok(())
    }

    fn map_write_error(&self, err: mongodb::error::Error, email: &str) -> AdminError {
        if is_duplicate_key(&err) {
            AdminError::duplicate("User", "email", email)
        } else {
            AdminError::Database(err)
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn paginate(&self, page: PageRequest, sort: UserSort) -> Result<Page<UserWithRoles>> {
        let total = self.collection.count_documents(doc! {}).await?;
        let users: Vec<User> = self
            .collection
            .find(doc! {})
            .sort(sort.mongo_sort())
            .skip(page.offset())
            .limit(page.limit())
            .await?
            .try_collect()
            .await?;

        let role_ids: Vec<i64> = users.iter().flat_map(|u| u.role_ids.iter().copied()).collect();
        let roles = self.roles_by_ids(&normalize_role_ids(&role_ids)).await?;

        Ok(Page::new(attach_roles(users, &roles), total))
    }

    async fn find(&self, id: i64) -> Result<UserWithRoles> {
        let user = self.load(id).await?;
        let roles = self.roles_by_ids(&user.role_ids).await?;
        Ok(UserWithRoles { user, roles })
    }

    async fn create(&self, new_user: NewUser, role_ids: &[i64]) -> Result<User> {
        new_user.validate()?;
        self.check_email_free(&new_user.email, None).await?;
        self.check_roles(role_ids).await?;

        let hash = self.passwords.hash_password(&new_user.password)?;
        let id = self.sequence.next("users").await?;

        let mut user = User::new(id, new_user.name.trim(), &new_user.email, hash);
        user.assign_roles(role_ids);

        self.collection
            .insert_one(&user)
            .await
            .map_err(|e| self.map_write_error(e, &user.email))?;

        info!(user_id = user.id, roles = ?user.role_ids, "Created user");
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges, role_ids: &[i64]) -> Result<User> {
        changes.validate()?;
        let mut user = self.load(id).await?;
        if let Some(email) = &changes.email {
            self.check_email_free(email, Some(id)).await?;
        }
        self.check_roles(role_ids).await?;

        user.apply(&changes);
        user.assign_roles(role_ids);
        user.touch();
        self.replace(&user).await?;

        info!(user_id = id, roles = ?user.role_ids, "Updated user");
        Ok(user)
    }

    async fn update_password(&self, id: i64, password: &str) -> Result<()> {
        let mut user = self.load(id).await?;
        user.password = self.passwords.hash_password(password)?;
        user.touch();
        self.replace(&user).await?;

        info!(user_id = id, "Updated user password");
        Ok(())
    }

    async fn destroy(&self, id: i64) -> Result<()> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AdminError::not_found("User", id));
        }
        debug!(user_id = id, "Deleted user");
        Ok(())
    }
}
