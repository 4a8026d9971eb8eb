//! User Aggregate
//!
//! Accounts, their role assignments and the admin controller.

pub mod api;
pub mod entity;
pub mod repository;

pub use api::{users_router, UsersState, DEFAULT_BASE_PATH};
pub use entity::{NewUser, User, UserChanges, UserResponse, UserWithRoles};
pub use repository::{MongoUserRepository, UserRepository, UserSort, UserSortField};
