//! Roster Admin
//!
//! User administration for the Roster service:
//! - User accounts with Argon2id password hashes
//! - Many-to-many role assignments, replaced wholesale on save
//! - Paginated, sortable listing for the admin table widget
//! - Server-rendered forms with flash messages
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access (trait + MongoDB implementation)
//! - `api` - HTTP endpoints (users only)

pub mod permission;
pub mod role;
pub mod user;

pub mod auth;
pub mod seed;
pub mod shared;

use utoipa_axum::router::OpenApiRouter;

pub use shared::error::{AdminError, Result};

pub use auth::password_service::{Argon2Config, PasswordPolicy, PasswordService};
pub use permission::{MongoPermissionRepository, Permission, PermissionRepository};
pub use role::{format_to_tree, MongoRoleRepository, Role, RoleOrder, RoleRepository, TreeNode};
pub use seed::{DevDataSeeder, MongoSeedStore, SeedStore};
pub use shared::api_common::{Page, PageRequest, PagingLimits, SortDirection};
pub use shared::i18n::{Locale, Translator};
pub use shared::memory_store::InMemoryStore;
pub use shared::views::{MiniJinjaEngine, TemplateEngine};
pub use user::{
    users_router, MongoUserRepository, NewUser, User, UserChanges, UserRepository, UserResponse,
    UserSort, UserSortField, UserWithRoles, UsersState, DEFAULT_BASE_PATH,
};

/// The users controller mounted at `state.base_path`.
pub fn admin_router(state: UsersState) -> OpenApiRouter {
    let base_path = state.base_path.clone();
    OpenApiRouter::new().nest(&base_path, users_router(state))
}
