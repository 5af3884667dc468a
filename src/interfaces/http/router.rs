//! API router with Swagger UI

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::domain::rbac::permission::{
    ADMIN_READ, PERMISSION_CREATE, PERMISSION_DELETE, PERMISSION_READ, PERMISSION_UPDATE,
    ROLE_CREATE, ROLE_DELETE, ROLE_READ, ROLE_UPDATE, SYSTEM_ADMIN_READ, USER_DELETE_ALL,
    USER_DELETE_SELF, USER_DEMOTE, USER_PROMOTE_ADMIN, USER_PROMOTE_MODERATOR,
    USER_PROMOTE_SYSTEM_ADMIN, USER_READ_ALL, USER_READ_SELF, USER_UPDATE_ALL, USER_UPDATE_SELF,
};
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse};
use crate::interfaces::http::middleware::{
    auth_middleware, with_permissions, with_role, AuthState, ADMIN_ROLES,
};
use crate::interfaces::http::modules::{
    auth, health, me, metrics, permissions, request_id, roles, users,
};
use crate::interfaces::http::state::AppState;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token returned by /api/v1/auth/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::interfaces::http::common::SESSION_COOKIE,
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        metrics::prometheus_metrics,
        // Auth
        auth::register,
        auth::login,
        auth::logout,
        auth::verify_email,
        auth::resend_verification,
        auth::password_reset_request,
        auth::password_reset_confirm,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::request_deletion,
        users::delete_user,
        users::promote_to_moderator,
        users::promote_to_admin,
        users::promote_to_system_admin,
        users::demote,
        users::change_role,
        // Roles
        roles::list_roles,
        roles::get_role,
        roles::create_role,
        roles::update_role,
        roles::delete_role,
        roles::list_role_permissions,
        roles::grant_permission,
        roles::revoke_permission,
        // Permissions
        permissions::list_permissions,
        permissions::get_permission,
        permissions::create_permission,
        permissions::update_permission,
        permissions::delete_permission,
        // Session
        me::me,
        me::my_permissions,
    ),
    components(
        schemas(
            ApiResponse<String>,
            PaginatedResponse<users::UserView>,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LoginUser,
            auth::EmailRequest,
            auth::PasswordResetConfirmRequest,
            users::UserView,
            users::UpdateUserRequest,
            users::DemoteRequest,
            users::ChangeRoleRequest,
            roles::RoleView,
            roles::CreateRoleRequest,
            roles::UpdateRoleRequest,
            permissions::PermissionView,
            permissions::CreatePermissionRequest,
            permissions::UpdatePermissionRequest,
            me::SessionView,
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness, database health and Prometheus metrics"),
        (name = "Authentication", description = "Registration, email verification, login and password reset"),
        (name = "Users", description = "Profiles and two-step account deletion"),
        (name = "Roles", description = "Roles, grants and role transitions"),
        (name = "Permissions", description = "Permission catalog"),
        (name = "Session", description = "The caller's own session"),
    ),
    info(
        title = "RBAC Service API",
        version = "1.0.0",
        description = "Identity lifecycle and role-based access control",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// `/api/v1` routes. Public auth endpoints first; everything else sits
/// behind the session middleware, with per-method permission guards.
fn api_routes(state: AppState) -> Router {
    let evaluator = state.evaluator.clone();
    let auth_state = AuthState {
        tokens: state.tokens.clone(),
    };

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify/{token}", get(auth::verify_email))
        .route("/auth/resend-verification", post(auth::resend_verification))
        .route("/auth/password-reset-request", post(auth::password_reset_request))
        .route("/auth/password-reset-confirm", post(auth::password_reset_confirm));

    let user_routes = Router::new()
        .route(
            "/users",
            with_permissions(get(users::list_users), &evaluator, &[USER_READ_ALL]),
        )
        .route(
            "/users/{id}",
            with_permissions(
                get(users::get_user),
                &evaluator,
                &[USER_READ_SELF, USER_READ_ALL],
            )
            .merge(with_permissions(
                put(users::update_user),
                &evaluator,
                &[USER_UPDATE_SELF, USER_UPDATE_ALL],
            ))
            .merge(with_permissions(
                post(users::request_deletion),
                &evaluator,
                &[USER_DELETE_SELF],
            ))
            .merge(with_permissions(
                delete(users::delete_user),
                &evaluator,
                &[USER_DELETE_ALL],
            )),
        )
        .route(
            "/users/{id}/promote/moderator",
            with_permissions(
                post(users::promote_to_moderator),
                &evaluator,
                &[USER_PROMOTE_MODERATOR],
            ),
        )
        .route(
            "/users/{id}/promote/admin",
            with_permissions(
                post(users::promote_to_admin),
                &evaluator,
                &[USER_PROMOTE_ADMIN],
            ),
        )
        .route(
            "/users/{id}/promote/system-admin",
            with_permissions(
                post(users::promote_to_system_admin),
                &evaluator,
                &[USER_PROMOTE_SYSTEM_ADMIN],
            ),
        )
        .route(
            "/users/{id}/demote",
            with_permissions(post(users::demote), &evaluator, &[USER_DEMOTE]),
        )
        .route(
            "/users/{id}/role",
            with_role(post(users::change_role), &evaluator, ADMIN_ROLES),
        );

    let role_routes = Router::new()
        .route(
            "/roles",
            with_permissions(
                get(roles::list_roles),
                &evaluator,
                &[ROLE_READ, ADMIN_READ, SYSTEM_ADMIN_READ],
            )
            .merge(with_permissions(
                post(roles::create_role),
                &evaluator,
                &[ROLE_CREATE],
            )),
        )
        .route(
            "/roles/{id}",
            with_permissions(get(roles::get_role), &evaluator, &[ROLE_READ])
                .merge(with_permissions(
                    put(roles::update_role),
                    &evaluator,
                    &[ROLE_UPDATE],
                ))
                .merge(with_permissions(
                    delete(roles::delete_role),
                    &evaluator,
                    &[ROLE_DELETE],
                )),
        )
        .route(
            "/roles/{id}/permissions",
            with_permissions(
                get(roles::list_role_permissions),
                &evaluator,
                &[ROLE_READ],
            ),
        )
        .route(
            "/roles/{id}/permissions/{permission_id}",
            with_role(
                post(roles::grant_permission).delete(roles::revoke_permission),
                &evaluator,
                ADMIN_ROLES,
            ),
        );

    let permission_routes = Router::new()
        .route(
            "/permissions",
            with_permissions(
                get(permissions::list_permissions),
                &evaluator,
                &[PERMISSION_READ],
            )
            .merge(with_permissions(
                post(permissions::create_permission),
                &evaluator,
                &[PERMISSION_CREATE],
            )),
        )
        .route(
            "/permissions/{id}",
            with_permissions(
                get(permissions::get_permission),
                &evaluator,
                &[PERMISSION_READ],
            )
            .merge(with_permissions(
                put(permissions::update_permission),
                &evaluator,
                &[PERMISSION_UPDATE],
            ))
            .merge(with_permissions(
                delete(permissions::delete_permission),
                &evaluator,
                &[PERMISSION_DELETE],
            )),
        );

    let protected = Router::new()
        .merge(user_routes)
        .merge(role_routes)
        .merge(permission_routes)
        .route("/me", get(me::me))
        .route("/me/permissions", get(me::my_permissions))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    public.merge(protected).with_state(state)
}

/// Create the full application router.
pub fn create_api_router(
    state: AppState,
    health_state: health::HealthState,
    metrics_state: metrics::MetricsState,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .with_state(metrics_state);

    Router::new()
        .merge(swagger_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .nest("/api/v1", api_routes(state))
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_routes_and_schemes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/auth/login",
            "/api/v1/auth/verify/{token}",
            "/api/v1/users/{id}",
            "/api/v1/users/{id}/promote/system-admin",
            "/api/v1/roles/{id}/permissions/{permission_id}",
            "/api/v1/permissions/{id}",
            "/api/v1/me/permissions",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }

        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert!(schemes.contains_key("cookie_auth"));
    }
}
