//! Role Repository
//!
//! Roles are read-only from the admin's point of view: listed for the
//! assignment widgets and resolved by id when attached to users.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::{doc, Document}, Collection, Database};

use crate::role::entity::Role;
use crate::role::tree::{format_to_tree, TreeNode};
use crate::shared::api_common::SortDirection;
use crate::shared::error::Result;
use crate::shared::sequence::IdSequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSortField {
    Id,
    Name,
}

impl RoleSortField {
    fn mongo_field(self) -> &'static str {
        match self {
            Self::Id => "_id",
            Self::Name => "name",
        }
    }
}

/// Ordering for role listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleOrder {
    pub field: RoleSortField,
    pub direction: SortDirection,
}

impl RoleOrder {
    pub const ID_ASC: RoleOrder = RoleOrder { field: RoleSortField::Id, direction: SortDirection::Asc };
    pub const ID_DESC: RoleOrder = RoleOrder { field: RoleSortField::Id, direction: SortDirection::Desc };

    /// Sort roles in place the way a database query would.
    pub fn sort(&self, roles: &mut [Role]) {
        match self.field {
            RoleSortField::Id => roles.sort_by_key(|r| r.id),
            RoleSortField::Name => roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id))),
        }
        if self.direction == SortDirection::Desc {
            roles.reverse();
        }
    }
}

impl Default for RoleOrder {
    fn default() -> Self {
        Self::ID_ASC
    }
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Every role, ordered.
    async fn list_all(&self, order: RoleOrder) -> Result<Vec<Role>>;

    /// `list_all` shaped for the tree selector.
    async fn list_all_as_tree(&self, order: RoleOrder) -> Result<Vec<TreeNode>> {
        let roles = self.list_all(order).await?;
        Ok(format_to_tree(&roles))
    }
}

pub struct MongoRoleRepository {
    collection: Collection<Role>,
    sequence: IdSequence,
}

impl MongoRoleRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("roles"),
            sequence: IdSequence::new(db),
        }
    }

    /// Insert a role under a freshly allocated id.
    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Role> {
        let id = self.sequence.next("roles").await?;
        let mut role = Role::new(id, name);
        role.description = description.map(str::to_string);
        self.collection.insert_one(&role).await?;
        Ok(role)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }
}

#[async_trait]
impl RoleRepository for MongoRoleRepository {
    async fn list_all(&self, order: RoleOrder) -> Result<Vec<Role>> {
        let mut sort = Document::new();
        sort.insert(order.field.mongo_field(), order.direction.as_i32());
        sort.insert("_id", order.direction.as_i32());

        let cursor = self.collection.find(doc! {}).sort(sort).await?;
        Ok(cursor.try_collect().await?)
    }
}
