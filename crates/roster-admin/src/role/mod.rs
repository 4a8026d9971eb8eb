//! Role Aggregate
//!
//! Roles as seen by the user admin: listed, formatted for the tree
//! selector, and assigned to users. Role management lives elsewhere.

pub mod entity;
pub mod repository;
pub mod tree;

pub use entity::{Role, RoleResponse};
pub use repository::{MongoRoleRepository, RoleOrder, RoleRepository, RoleSortField};
pub use tree::{format_to_tree, TreeNode};
