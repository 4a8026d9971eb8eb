//! Permission Aggregate
//!
//! Named capabilities bundled into roles. The user admin holds a
//! repository handle but never mutates permissions.

pub mod entity;
pub mod repository;

pub use entity::Permission;
pub use repository::{MongoPermissionRepository, PermissionRepository};
