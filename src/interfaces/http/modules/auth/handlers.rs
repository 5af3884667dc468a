//! Authentication API handlers
//!
//! Thin wrappers over `IdentityService`. Session delivery (cookie + body)
//! is the only logic that lives here.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::dto::{
    EmailRequest, LoginRequest, LoginResponse, LoginUser, PasswordResetConfirmRequest,
    RegisterRequest, ResetTokenQuery,
};
use crate::application::identity::RESET_REQUEST_MESSAGE;
use crate::application::{PasswordResetCredential, RegisterInput, ResendOutcome};
use crate::interfaces::http::common::{
    clear_session_cookie, session_cookie, ApiError, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::modules::users::UserView;
use crate::interfaces::http::state::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<UserView>),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> ApiResult<ApiResponse<UserView>> {
    let user = state
        .identity
        .register(RegisterInput {
            username: request.username,
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;

    Ok(ApiResponse::created("User created successfully", UserView::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified or account disabled")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Response> {
    let result = state.identity.login(&request.email, &request.password).await?;

    let cookie = session_cookie(&result.session.token, result.expires_in, state.secure_cookies);
    let body = ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token: result.session.token,
            token_type: "Bearer".to_string(),
            expires_in: result.expires_in,
            user: LoginUser::from(&result.user),
        },
    );

    Ok(([(header::SET_COOKIE, cookie)], body).into_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Authentication",
    responses((status = 200, description = "Session cookie cleared"))
)]
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie(state.secure_cookies))],
        ApiResponse::message(StatusCode::OK, "Logged out successfully"),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify/{token}",
    tag = "Authentication",
    params(("token" = String, Path, description = "Verification token from the email")),
    responses(
        (status = 200, description = "Email verified", body = ApiResponse<UserView>),
        (status = 401, description = "Invalid, expired or wrong-purpose token"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<ApiResponse<UserView>> {
    let user = state.identity.verify_email(&token).await?;
    Ok(ApiResponse::ok("Email verified successfully", UserView::from(user)))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/resend-verification",
    tag = "Authentication",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Verification mail sent, or nothing to do"),
        (status = 404, description = "No account with that email")
    )
)]
pub async fn resend_verification(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> ApiResult<ApiResponse<()>> {
    let message = match state.identity.resend_verification(&request.email).await? {
        ResendOutcome::Sent => "Verification email sent",
        ResendOutcome::AlreadyVerified => "Email already verified",
    };
    Ok(ApiResponse::message(StatusCode::OK, message))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset-request",
    tag = "Authentication",
    request_body = EmailRequest,
    responses((status = 200, description = "Same answer whether or not the account exists"))
)]
pub async fn password_reset_request(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<EmailRequest>,
) -> ApiResult<ApiResponse<()>> {
    state.identity.request_password_reset(&request.email).await?;
    Ok(ApiResponse::message(StatusCode::OK, RESET_REQUEST_MESSAGE))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset-confirm",
    tag = "Authentication",
    params(ResetTokenQuery),
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Missing credential or invalid password"),
        (status = 401, description = "Invalid, expired or used reset token")
    )
)]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Query(query): Query<ResetTokenQuery>,
    ValidatedJson(request): ValidatedJson<PasswordResetConfirmRequest>,
) -> ApiResult<ApiResponse<()>> {
    let credential = match (request.token.or(query.token), request.email, request.code) {
        (Some(token), _, _) => PasswordResetCredential::Token(token),
        (None, Some(email), Some(code)) => PasswordResetCredential::Code { email, code },
        _ => {
            return Err(ApiError::bad_request(
                "Provide either a reset token or an email and code",
            ))
        }
    };

    state
        .identity
        .confirm_password_reset(credential, &request.new_password)
        .await?;
    Ok(ApiResponse::message(
        StatusCode::OK,
        "Password has been reset successfully",
    ))
}
