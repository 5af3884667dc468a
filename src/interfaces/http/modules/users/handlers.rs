//! User management API handlers
//!
//! Route guards have already checked the coarse permission; the
//! self-versus-other rules are applied by `UserService`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension,
};

use super::dto::{ChangeRoleRequest, DemoteRequest, ListUsersParams, UpdateUserRequest, UserView};
use crate::application::Actor;
use crate::domain::{GetUserDto, RoleName, UpdateUserDto};
use crate::interfaces::http::common::{
    ApiError, ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::{resolve_actor, AuthenticatedUser, GrantedPermissions};
use crate::interfaces::http::state::AppState;

fn parse_role(name: &str) -> ApiResult<RoleName> {
    name.parse::<RoleName>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "User list", body = ApiResponse<PaginatedResponse<UserView>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Missing user:read:all")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<ApiResponse<PaginatedResponse<UserView>>> {
    let user_type = params.user_type.as_deref().map(parse_role).transpose()?;
    let dto = GetUserDto {
        search: params.search,
        user_type,
        page: params.page,
        page_size: params.page_size,
        sort_by: params.sort_by,
    };

    let result = state.users.list_users(dto).await?;
    Ok(ApiResponse::ok("Users retrieved", result.into()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserView>),
        (status = 403, description = "Not allowed to view this account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(GrantedPermissions(granted)): Extension<GrantedPermissions>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    let user = state.users.get_user(&caller.user_id, &id, &granted).await?;
    Ok(ApiResponse::ok("User retrieved", UserView::from(user)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserView>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Not allowed to update this account"),
        (status = 409, description = "Username already taken")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Extension(GrantedPermissions(granted)): Extension<GrantedPermissions>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<UserView>> {
    let dto = UpdateUserDto {
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
    };
    let user = state
        .users
        .update_user(&caller.user_id, &id, &granted, dto)
        .await?;
    Ok(ApiResponse::ok("User updated successfully", UserView::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Own user ID")),
    responses(
        (status = 200, description = "Deletion requested", body = ApiResponse<UserView>),
        (status = 403, description = "Not the caller's own account")
    )
)]
pub async fn request_deletion(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    let user = state.users.request_deletion(&caller.user_id, &id).await?;
    Ok(ApiResponse::ok("Account deletion requested", UserView::from(user)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "Users",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "User has not requested deletion"),
        (status = 403, description = "Self-deletion or system administrator"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state.users.delete_user(&caller.user_id, &id).await?;
    Ok(ApiResponse::message(StatusCode::OK, "User deleted successfully"))
}

async fn promote(
    state: &AppState,
    caller: &AuthenticatedUser,
    id: &str,
    to: RoleName,
) -> ApiResult<ApiResponse<UserView>> {
    let actor = resolve_actor(&state.evaluator, caller).await?;
    let user = state.admin.promote(&actor, id, to).await?;
    Ok(ApiResponse::ok(
        format!("User promoted to {}", to),
        UserView::from(user),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/promote/moderator",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User promoted", body = ApiResponse<UserView>),
        (status = 400, description = "Transition not allowed from the current role"),
        (status = 403, description = "Caller may not perform this transition")
    )
)]
pub async fn promote_to_moderator(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    promote(&state, &caller, &id, RoleName::Moderator).await
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/promote/admin",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User promoted", body = ApiResponse<UserView>),
        (status = 400, description = "Transition not allowed from the current role"),
        (status = 403, description = "Caller may not perform this transition")
    )
)]
pub async fn promote_to_admin(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    promote(&state, &caller, &id, RoleName::Admin).await
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/promote/system-admin",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User promoted", body = ApiResponse<UserView>),
        (status = 400, description = "Transition not allowed from the current role"),
        (status = 403, description = "Caller may not perform this transition")
    )
)]
pub async fn promote_to_system_admin(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    promote(&state, &caller, &id, RoleName::SystemAdmin).await
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/demote",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body(content = DemoteRequest, description = "Optional; defaults to `user`"),
    responses(
        (status = 200, description = "User demoted", body = ApiResponse<UserView>),
        (status = 400, description = "Transition not allowed or unknown role"),
        (status = 403, description = "Caller may not perform this transition")
    )
)]
pub async fn demote(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<ApiResponse<UserView>> {
    let request: DemoteRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DemoteRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON: {}", e)))?
    };
    let to = request.role_name.as_deref().map(parse_role).transpose()?;

    let actor = resolve_actor(&state.evaluator, &caller).await?;
    let user = state.admin.demote(&actor, &id, to).await?;
    Ok(ApiResponse::ok(
        format!("User demoted to {}", user.user_type),
        UserView::from(user),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/role",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    request_body = ChangeRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = ApiResponse<UserView>),
        (status = 400, description = "Unknown role or transition not allowed"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
pub async fn change_role(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChangeRoleRequest>,
) -> ApiResult<ApiResponse<UserView>> {
    let to = parse_role(&request.role_name)?;
    let user = state.admin.change_role(&actor, &id, to).await?;
    Ok(ApiResponse::ok(
        format!("User role changed to {}", to),
        UserView::from(user),
    ))
}
