//! Role API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::dto::{CreateRoleRequest, RoleView, UpdateRoleRequest};
use crate::domain::rbac::UpdateRole;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::modules::permissions::PermissionView;
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "All roles", body = ApiResponse<Vec<RoleView>>),
        (status = 403, description = "Insufficient permissions")
    )
)]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<RoleView>>> {
    let roles = state.admin.list_roles().await?;
    Ok(ApiResponse::ok(
        "Roles retrieved",
        roles.into_iter().map(RoleView::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role found", body = ApiResponse<RoleView>),
        (status = 404, description = "Role not found")
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<RoleView>> {
    let role = state.admin.get_role(&id).await?;
    Ok(ApiResponse::ok("Role retrieved", RoleView::from(role)))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = ApiResponse<RoleView>),
        (status = 409, description = "Role name already exists")
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateRoleRequest>,
) -> ApiResult<ApiResponse<RoleView>> {
    let role = state
        .admin
        .create_role(&request.name, request.description)
        .await?;
    Ok(ApiResponse::created("Role created successfully", RoleView::from(role)))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<RoleView>),
        (status = 403, description = "Built-in roles cannot be renamed"),
        (status = 404, description = "Role not found")
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<RoleView>> {
    let role = state
        .admin
        .update_role(
            &id,
            UpdateRole {
                name: request.name,
                description: request.description,
            },
        )
        .await?;
    Ok(ApiResponse::ok("Role updated successfully", RoleView::from(role)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 403, description = "Built-in roles cannot be deleted"),
        (status = 409, description = "Role is still assigned")
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state.admin.delete_role(&id).await?;
    Ok(ApiResponse::message(StatusCode::OK, "Role deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{id}/permissions",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Permissions granted to the role", body = ApiResponse<Vec<PermissionView>>),
        (status = 404, description = "Role not found")
    )
)]
pub async fn list_role_permissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Vec<PermissionView>>> {
    let permissions = state.admin.list_role_permissions(&id).await?;
    Ok(ApiResponse::ok(
        "Role permissions retrieved",
        permissions.into_iter().map(PermissionView::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/roles/{id}/permissions/{permission_id}",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(
        ("id" = String, Path, description = "Role ID"),
        ("permission_id" = String, Path, description = "Permission ID")
    ),
    responses(
        (status = 200, description = "Permission granted (or already held)"),
        (status = 404, description = "Role or permission not found")
    )
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<()>> {
    let message = if state.admin.grant_permission(&id, &permission_id).await? {
        "Permission granted to role"
    } else {
        "Role already holds this permission"
    };
    Ok(ApiResponse::message(StatusCode::OK, message))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{id}/permissions/{permission_id}",
    tag = "Roles",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(
        ("id" = String, Path, description = "Role ID"),
        ("permission_id" = String, Path, description = "Permission ID")
    ),
    responses(
        (status = 200, description = "Permission revoked"),
        (status = 404, description = "Role or permission not found")
    )
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    Path((id, permission_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<()>> {
    let message = if state.admin.revoke_permission(&id, &permission_id).await? {
        "Permission revoked from role"
    } else {
        "Role did not hold this permission"
    };
    Ok(ApiResponse::message(StatusCode::OK, message))
}
