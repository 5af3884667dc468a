//! Authentication and authorization middleware for Axum
//!
//! Three layers, applied outermost first:
//!
//! 1. [`auth_middleware`] turns a session token (cookie or bearer header)
//!    into an [`AuthenticatedUser`] extension, or answers 401.
//! 2. [`require_any_permission`] resolves the caller's permissions and
//!    answers 403 unless at least one of the route's permissions is held.
//!    The resolved set is passed on as [`GrantedPermissions`].
//! 3. [`require_role`] is the coarse check used by a few admin routes. It
//!    reads the caller's current role from the store and passes it on as an
//!    [`Actor`] extension.
//!
//! Only routes wrapped by a guard touch the store. The role claim in the
//! session is informational; authority always comes from the store.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::application::{Actor, AuthorizationEvaluator};
use crate::domain::{PermissionSet, RoleName};
use crate::infrastructure::crypto::{TokenClaims, TokenCodec, TokenError, TokenPurpose};
use crate::interfaces::http::common::{session_token_from_cookies, ApiError};

#[derive(Clone)]
pub struct AuthState {
    pub tokens: std::sync::Arc<TokenCodec>,
}

/// Identity proven by a session token. No store round-trip is needed to
/// build it: username and role travel in the token. `role` is the role at
/// login; guards use [`resolve_actor`] instead.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,
    pub role: RoleName,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: TokenClaims) -> Option<Self> {
        let role = claims.role_name()?;
        let expires_at = claims.expires_at();
        Some(Self {
            user_id: claims.sub,
            username: claims.username?,
            role,
            expires_at,
        })
    }
}

/// The caller as an [`Actor`] with the role the store holds right now.
/// 403 when the account no longer has an assignment.
pub async fn resolve_actor(
    evaluator: &AuthorizationEvaluator,
    user: &AuthenticatedUser,
) -> Result<Actor, ApiError> {
    match evaluator.current_role(&user.user_id).await? {
        Some(role) => {
            if role != user.role {
                debug!(
                    user_id = %user.user_id,
                    session_role = %user.role,
                    current_role = %role,
                    "Session role claim is stale"
                );
            }
            Ok(Actor::new(user.user_id.clone(), role))
        }
        None => {
            warn!(user_id = %user.user_id, "Caller holds no role assignment");
            Err(ApiError::forbidden("Insufficient role"))
        }
    }
}

/// Permission set resolved by [`require_any_permission`] for this request.
#[derive(Clone, Debug)]
pub struct GrantedPermissions(pub PermissionSet);

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Session authentication: cookie first, then `Authorization: Bearer`.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = session_token_from_cookies(request.headers()).or_else(|| bearer_token(&request));
    let Some(token) = token else {
        return ApiError::unauthorized("Missing authentication token").into_response();
    };

    let claims = match state.tokens.validate(&token, TokenPurpose::Session) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            return ApiError::unauthorized("Token has expired").into_response();
        }
        Err(e) => {
            warn!(reason = %e, "Rejected session token");
            return ApiError::unauthorized("Invalid authentication token").into_response();
        }
    };

    let Some(user) = AuthenticatedUser::from_claims(claims) else {
        return ApiError::unauthorized("Invalid authentication token").into_response();
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Route-level guard state: the route passes if any one permission is held.
#[derive(Clone)]
pub struct PermissionGuard {
    pub evaluator: AuthorizationEvaluator,
    pub required: &'static [&'static str],
}

pub async fn require_any_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return ApiError::unauthorized("Missing authentication token").into_response();
    };

    let granted = match guard.evaluator.resolve_permissions(&user.user_id).await {
        Ok(granted) => granted,
        Err(e) => return ApiError::from(e).into_response(),
    };

    if !guard.evaluator.authorize(guard.required, &granted) {
        warn!(
            user_id = %user.user_id,
            required = ?guard.required,
            "Permission denied"
        );
        return ApiError::forbidden("Insufficient permissions").into_response();
    }

    request.extensions_mut().insert(GrantedPermissions(granted));
    next.run(request).await
}

#[derive(Clone)]
pub struct RoleGuard {
    pub evaluator: AuthorizationEvaluator,
    pub allowed: &'static [RoleName],
}

/// Roles allowed through the coarse administrative check.
pub const ADMIN_ROLES: &[RoleName] = &[RoleName::Admin, RoleName::SystemAdmin];

pub async fn require_role(
    State(guard): State<RoleGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthenticatedUser>().cloned() else {
        return ApiError::unauthorized("Missing authentication token").into_response();
    };
    let actor = match resolve_actor(&guard.evaluator, &user).await {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    if !guard.allowed.contains(&actor.role) {
        warn!(user_id = %user.user_id, role = %actor.role, "Role check failed");
        return ApiError::forbidden("Insufficient role").into_response();
    }

    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// Wrap one method route with a permission guard.
pub fn with_permissions<S>(
    route: MethodRouter<S>,
    evaluator: &AuthorizationEvaluator,
    required: &'static [&'static str],
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        PermissionGuard {
            evaluator: evaluator.clone(),
            required,
        },
        require_any_permission,
    ))
}

/// Wrap one method route with the coarse role check.
pub fn with_role<S>(
    route: MethodRouter<S>,
    evaluator: &AuthorizationEvaluator,
    allowed: &'static [RoleName],
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        RoleGuard {
            evaluator: evaluator.clone(),
            allowed,
        },
        require_role,
    ))
}
