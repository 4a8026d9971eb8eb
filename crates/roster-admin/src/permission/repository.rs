//! Permission Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::permission::entity::Permission;
use crate::shared::error::Result;
use crate::shared::sequence::IdSequence;

#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Every permission, ascending by id.
    async fn list_all(&self) -> Result<Vec<Permission>>;
}

pub struct MongoPermissionRepository {
    collection: Collection<Permission>,
    sequence: IdSequence,
}

impl MongoPermissionRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("permissions"),
            sequence: IdSequence::new(db),
        }
    }

    pub async fn create(&self, name: &str, description: Option<&str>) -> Result<Permission> {
        let id = self.sequence.next("permissions").await?;
        let mut permission = Permission::new(id, name);
        permission.description = description.map(str::to_string);
        self.collection.insert_one(&permission).await?;
        Ok(permission)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Permission>> {
        Ok(self.collection.find_one(doc! { "name": name }).await?)
    }
}

#[async_trait]
impl PermissionRepository for MongoPermissionRepository {
    async fn list_all(&self) -> Result<Vec<Permission>> {
        let cursor = self.collection.find(doc! {}).sort(doc! { "_id": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }
}
