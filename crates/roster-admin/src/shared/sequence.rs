//! Integer id allocation for MongoDB collections.
//!
//! One document per collection in `counters`, bumped with `$inc`.

use mongodb::{
    bson::{doc, Document},
    options::ReturnDocument,
    Collection, Database,
};

use crate::shared::error::{AdminError, Result};

#[derive(Clone)]
pub struct IdSequence {
    counters: Collection<Document>,
}

impl IdSequence {
    pub fn new(db: &Database) -> Self {
        Self {
            counters: db.collection("counters"),
        }
    }

    /// Next id for `name`, starting at 1.
    pub async fn next(&self, name: &str) -> Result<i64> {
        let counter = self
            .counters
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AdminError::internal(format!("id sequence '{}' was not created", name)))?;

        counter
            .get_i64("seq")
            .map_err(|e| AdminError::internal(format!("id sequence '{}' is corrupt: {}", name, e)))
    }
}
