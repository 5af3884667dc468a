//! Permission API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::dto::{CreatePermissionRequest, PermissionView, UpdatePermissionRequest};
use crate::application::NewPermissionInput;
use crate::domain::rbac::UpdatePermission;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/permissions",
    tag = "Permissions",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "Permission catalog", body = ApiResponse<Vec<PermissionView>>),
        (status = 403, description = "Missing permission:read")
    )
)]
pub async fn list_permissions(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<Vec<PermissionView>>> {
    let permissions = state.admin.list_permissions().await?;
    Ok(ApiResponse::ok(
        "Permissions retrieved",
        permissions.into_iter().map(PermissionView::from).collect(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission found", body = ApiResponse<PermissionView>),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<PermissionView>> {
    let permission = state.admin.get_permission(&id).await?;
    Ok(ApiResponse::ok("Permission retrieved", PermissionView::from(permission)))
}

#[utoipa::path(
    post,
    path = "/api/v1/permissions",
    tag = "Permissions",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    request_body = CreatePermissionRequest,
    responses(
        (status = 201, description = "Permission created", body = ApiResponse<PermissionView>),
        (status = 400, description = "Malformed permission name"),
        (status = 409, description = "Permission name already exists")
    )
)]
pub async fn create_permission(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreatePermissionRequest>,
) -> ApiResult<ApiResponse<PermissionView>> {
    let permission = state
        .admin
        .create_permission(NewPermissionInput {
            name: request.name,
            description: request.description,
            resource: request.resource,
            action: request.action,
        })
        .await?;
    Ok(ApiResponse::created(
        "Permission created successfully",
        PermissionView::from(permission),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Permission ID")),
    request_body = UpdatePermissionRequest,
    responses(
        (status = 200, description = "Permission updated", body = ApiResponse<PermissionView>),
        (status = 404, description = "Permission not found"),
        (status = 409, description = "Permission name already exists")
    )
)]
pub async fn update_permission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdatePermissionRequest>,
) -> ApiResult<ApiResponse<PermissionView>> {
    let permission = state
        .admin
        .update_permission(
            &id,
            UpdatePermission {
                name: request.name,
                description: request.description,
                resource: request.resource,
                action: request.action,
            },
        )
        .await?;
    Ok(ApiResponse::ok(
        "Permission updated successfully",
        PermissionView::from(permission),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/permissions/{id}",
    tag = "Permissions",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    params(("id" = String, Path, description = "Permission ID")),
    responses(
        (status = 200, description = "Permission and its grants deleted"),
        (status = 404, description = "Permission not found")
    )
)]
pub async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state.admin.delete_permission(&id).await?;
    Ok(ApiResponse::message(StatusCode::OK, "Permission deleted successfully"))
}
