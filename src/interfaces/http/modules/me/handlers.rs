//! `GET /me` and `GET /me/permissions`

use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::interfaces::http::common::{ApiResponse, ApiResult};
use crate::interfaces::http::middleware::AuthenticatedUser;
use crate::interfaces::http::state::AppState;

/// Session claims of the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub user_id: String,
    pub username: String,
    pub user_type: String,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Session",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "Current session", body = ApiResponse<SessionView>),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn me(Extension(caller): Extension<AuthenticatedUser>) -> ApiResponse<SessionView> {
    ApiResponse::ok(
        "Session retrieved",
        SessionView {
            user_id: caller.user_id,
            username: caller.username,
            user_type: caller.role.to_string(),
            expires_at: caller.expires_at,
        },
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/me/permissions",
    tag = "Session",
    security(("bearer_auth" = []), ("cookie_auth" = [])),
    responses(
        (status = 200, description = "Sorted permission names", body = ApiResponse<Vec<String>>),
        (status = 401, description = "Missing, invalid or expired token")
    )
)]
pub async fn my_permissions(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
) -> ApiResult<ApiResponse<Vec<String>>> {
    let granted = state.evaluator.resolve_permissions(&caller.user_id).await?;
    Ok(ApiResponse::ok("Permissions retrieved", granted.into_vec()))
}
