//! Users Admin Controller
//!
//! Pages and JSON endpoints for managing user accounts and their role
//! assignments. Mounted under the configured admin base path
//! (`/admin/auth/user` by default).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::{cookie::CookieJar, Form, FormRejection};
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::permission::repository::PermissionRepository;
use crate::role::entity::RoleResponse;
use crate::role::repository::{RoleOrder, RoleRepository};
use crate::shared::api_common::{string_or_number, PagingLimits, SortDirection};
use crate::shared::error::{AdminError, Result};
use crate::shared::flash::{self, Flash};
use crate::shared::i18n::Translator;
use crate::shared::request::{referer, AsyncRequest};
use crate::shared::views::{render_html, MiniJinjaEngine, TemplateEngine};
use crate::user::entity::{NewUser, User, UserChanges, UserResponse};
use crate::user::repository::{UserRepository, UserSort, UserSortField};

pub const DEFAULT_BASE_PATH: &str = "/admin/auth/user";

/// Collaborators shared by every users handler
#[derive(Clone)]
pub struct UsersState {
    pub user_repo: Arc<dyn UserRepository>,
    pub role_repo: Arc<dyn RoleRepository>,
    /// Held for permission-aware views; no action reads it yet.
    pub permission_repo: Arc<dyn PermissionRepository>,
    pub views: Arc<dyn TemplateEngine>,
    pub translator: Translator,
    pub paging: PagingLimits,
    /// Mount point, no trailing slash; redirects are built from it
    pub base_path: String,
}

impl UsersState {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            permission_repo,
            views: Arc::new(MiniJinjaEngine::new()),
            translator: Translator::default(),
            paging: PagingLimits::default(),
            base_path: DEFAULT_BASE_PATH.to_string(),
        }
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_paging(mut self, paging: PagingLimits) -> Self {
        self.paging = paging;
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        let base_path = base_path.into();
        self.base_path = base_path.trim_end_matches('/').to_string();
        self
    }

    fn create_path(&self) -> String {
        format!("{}/create", self.base_path)
    }
}

/// Listing query sent by the table widget
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// 1-based page number
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    pub page: Option<u32>,

    /// Rows per page
    #[serde(default, deserialize_with = "string_or_number::deserialize_u32_opt")]
    pub page_size: Option<u32>,

    /// id, name, email, created_at or updated_at
    pub sort_field: Option<String>,

    /// asc/desc, or the widget's ascend/descend
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: UserListData,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListData {
    pub user: UserTotals,
    pub users: UserRows,
    /// Every role, ascending by id
    pub roles: Vec<RoleResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserTotals {
    pub total: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserRows {
    pub users: Vec<UserResponse>,
}

/// Create form submission
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StoreUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
    /// Repeatable; `assignees_roles[]` is accepted too
    #[serde(default, alias = "assignees_roles[]")]
    pub assignees_roles: Vec<String>,
}

impl StoreUserRequest {
    fn into_parts(self) -> Result<(NewUser, Vec<i64>)> {
        check_confirmation(&self.password, &self.password_confirmation)?;
        let role_ids = parse_role_ids(&self.assignees_roles)?;
        Ok((NewUser::new(self.name, self.email, self.password), role_ids))
    }
}

/// Edit form submission
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Full replacement set; absent means no roles
    #[serde(default)]
    pub assignees_roles: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateUserResponse {
    pub status: u16,
    pub message: String,
}

impl UpdateUserResponse {
    fn ok() -> Self {
        Self { status: 200, message: "ok".to_string() }
    }

    fn failed(message: String) -> Self {
        Self { status: 400, message }
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum DeleteUserResponse {
    Deleted { message: String },
    Failed { error: String },
}

fn check_confirmation(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(AdminError::validation("The password confirmation does not match"));
    }
    Ok(())
}

/// Blank entries are ignored; anything else must be an integer id.
fn parse_role_ids(raw: &[String]) -> Result<Vec<i64>> {
    raw.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| AdminError::validation(format!("Invalid role id: {}", s)))
        })
        .collect()
}

fn old_input(flash: Option<&Flash>) -> BTreeMap<String, String> {
    flash.map(|f| f.old_input.clone()).unwrap_or_default()
}

/// List users
///
/// Returns the JSON envelope for the table widget when called with
/// `X-Requested-With: XMLHttpRequest`, otherwise the page shell.
#[utoipa::path(
    get,
    path = "/",
    tag = "users",
    operation_id = "getAdminAuthUsers",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users page (JSON for XMLHttpRequest)", body = UserListResponse),
    )
)]
pub async fn list_users(
    State(state): State<UsersState>,
    AsyncRequest(is_async): AsyncRequest,
    Query(query): Query<ListUsersQuery>,
    jar: CookieJar,
) -> Result<Response> {
    if !is_async {
        let (jar, flash) = flash::take(jar);
        let page = render_html(
            state.views.as_ref(),
            "users/index.html",
            context! {
                base_path => &state.base_path,
                locale => state.translator.locale().tag(),
                flash => flash,
            },
        )?;
        return Ok((jar, page).into_response());
    }

    let page_request = state.paging.page_request(query.page, query.page_size);
    let sort = UserSort::new(
        UserSortField::parse(query.sort_field.as_deref()),
        SortDirection::from_widget(query.sort_order.as_deref()),
    );

    let page = state.user_repo.paginate(page_request, sort).await?;
    let roles = state.role_repo.list_all(RoleOrder::ID_ASC).await?;

    let body = UserListResponse {
        data: UserListData {
            user: UserTotals { total: page.total },
            users: UserRows {
                users: page.items.into_iter().map(UserResponse::from).collect(),
            },
            roles: roles.into_iter().map(RoleResponse::from).collect(),
        },
    };
    Ok(Json(body).into_response())
}

/// Create form
#[utoipa::path(
    get,
    path = "/create",
    tag = "users",
    operation_id = "getAdminAuthUsersCreate",
    responses(
        (status = 200, description = "User creation form", content_type = "text/html", body = String),
    )
)]
pub async fn create_form(
    State(state): State<UsersState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>)> {
    let roles = state.role_repo.list_all_as_tree(RoleOrder::ID_DESC).await?;
    let (jar, flash) = flash::take(jar);
    let old = old_input(flash.as_ref());

    let page = render_html(
        state.views.as_ref(),
        "users/create.html",
        context! {
            base_path => &state.base_path,
            locale => state.translator.locale().tag(),
            roles => roles,
            user_roles => Vec::<i64>::new(),
            old => old,
            flash => flash,
        },
    )?;
    Ok((jar, page))
}

async fn save_new_user(state: &UsersState, req: StoreUserRequest) -> Result<User> {
    let (new_user, role_ids) = req.into_parts()?;
    state.user_repo.create(new_user, &role_ids).await
}

/// Create a user
///
/// Redirects to the listing on success. Any failure redirects back with a
/// "save failed" flash and the submitted name and email.
#[utoipa::path(
    post,
    path = "/",
    tag = "users",
    operation_id = "postAdminAuthUsers",
    request_body(content = StoreUserRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the listing, or back to the form with a flash"),
    )
)]
pub async fn store_user(
    State(state): State<UsersState>,
    headers: HeaderMap,
    jar: CookieJar,
    form: std::result::Result<Form<StoreUserRequest>, FormRejection>,
) -> Response {
    let mut submitted = Flash::error(state.translator.translate("users.save_failed"));

    let result = match form {
        Ok(Form(req)) => {
            submitted = submitted.with_input("name", req.name.as_str()).with_input("email", req.email.as_str());
            save_new_user(&state, req).await
        }
        Err(rejection) => Err(AdminError::validation(rejection.to_string())),
    };

    match result {
        Ok(user) => {
            info!(user_id = user.id, "User created from admin form");
            (jar, Redirect::to(&state.base_path)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to create user");
            let back = referer(&headers).unwrap_or_else(|| state.create_path());
            (flash::put(jar, &submitted), Redirect::to(&back)).into_response()
        }
    }
}

/// Edit form
#[utoipa::path(
    get,
    path = "/{id}/edit",
    tag = "users",
    operation_id = "getAdminAuthUsersEdit",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User edit form", content_type = "text/html", body = String),
        (status = 404, description = "User not found"),
    )
)]
pub async fn edit_form(
    State(state): State<UsersState>,
    Path(id): Path<i64>,
) -> Result<Html<String>> {
    let found = state.user_repo.find(id).await?;
    let user_roles = found.role_ids();
    let roles = state.role_repo.list_all_as_tree(RoleOrder::ID_DESC).await?;

    render_html(
        state.views.as_ref(),
        "users/edit.html",
        context! {
            base_path => &state.base_path,
            locale => state.translator.locale().tag(),
            user => UserResponse::from(found),
            user_roles => user_roles,
            roles => roles,
        },
    )
}

/// Update a user
///
/// Always answers with `{status, message}`; failures of any kind are 400.
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "users",
    operation_id = "putAdminAuthUsersById",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UpdateUserResponse),
        (status = 400, description = "Update failed", body = UpdateUserResponse),
    )
)]
pub async fn update_user(
    State(state): State<UsersState>,
    id: std::result::Result<Path<i64>, PathRejection>,
    body: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> (StatusCode, Json<UpdateUserResponse>) {
    let outcome = match (id, body) {
        (Ok(Path(id)), Ok(Json(req))) => {
            let changes = UserChanges { name: req.name, email: req.email };
            let role_ids = req.assignees_roles.unwrap_or_default();
            state.user_repo.update(id, changes, &role_ids).await.map(|_| ())
        }
        (Err(rejection), _) => Err(AdminError::validation(rejection.body_text())),
        (_, Err(rejection)) => Err(AdminError::validation(rejection.body_text())),
    };

    let response = match outcome {
        Ok(()) => UpdateUserResponse::ok(),
        Err(e) => {
            warn!(error = %e, "Failed to update user");
            UpdateUserResponse::failed(e.to_string())
        }
    };
    (response.status_code(), Json(response))
}

/// Change-password form
#[utoipa::path(
    get,
    path = "/{id}/password",
    tag = "users",
    operation_id = "getAdminAuthUsersPassword",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "Change-password form", content_type = "text/html", body = String),
        (status = 404, description = "User not found"),
    )
)]
pub async fn change_password_form(
    State(state): State<UsersState>,
    Path(id): Path<i64>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>)> {
    let found = state.user_repo.find(id).await?;
    let (jar, flash) = flash::take(jar);

    let page = render_html(
        state.views.as_ref(),
        "users/change_password.html",
        context! {
            base_path => &state.base_path,
            locale => state.translator.locale().tag(),
            user => UserResponse::from(found),
            flash => flash,
        },
    )?;
    Ok((jar, page))
}

/// Set a new password
#[utoipa::path(
    post,
    path = "/{id}/password",
    tag = "users",
    operation_id = "postAdminAuthUsersPassword",
    params(("id" = i64, Path, description = "User id")),
    request_body(content = UpdatePasswordRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Password updated, redirect to the listing"),
        (status = 400, description = "Confirmation mismatch or policy violation"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn update_password(
    State(state): State<UsersState>,
    Path(id): Path<i64>,
    jar: CookieJar,
    Form(req): Form<UpdatePasswordRequest>,
) -> Result<(CookieJar, Redirect)> {
    check_confirmation(&req.password, &req.password_confirmation)?;
    state.user_repo.update_password(id, &req.password).await?;

    info!(user_id = id, "Password changed from admin form");
    let notice = Flash::success(state.translator.translate("users.updated_password"));
    Ok((flash::put(jar, &notice), Redirect::to(&state.base_path)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "users",
    operation_id = "deleteAdminAuthUsersById",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = DeleteUserResponse),
        (status = 400, description = "Delete failed", body = DeleteUserResponse),
    )
)]
pub async fn destroy_user(
    State(state): State<UsersState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> (StatusCode, Json<DeleteUserResponse>) {
    let outcome = match id {
        Ok(Path(id)) => state.user_repo.destroy(id).await,
        Err(rejection) => Err(AdminError::validation(rejection.body_text())),
    };

    match outcome {
        Ok(()) => (
            StatusCode::OK,
            Json(DeleteUserResponse::Deleted { message: "ok".to_string() }),
        ),
        Err(e) => {
            warn!(error = %e, "Failed to delete user");
            (
                StatusCode::BAD_REQUEST,
                Json(DeleteUserResponse::Failed { error: e.to_string() }),
            )
        }
    }
}

pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_users, store_user))
        .routes(routes!(create_form))
        .routes(routes!(edit_form))
        .routes(routes!(update_user, destroy_user))
        .routes(routes!(change_password_form, update_password))
        .with_state(state)
}
