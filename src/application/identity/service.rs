//! Identity service: application-layer orchestration
//!
//! HTTP handlers stay thin and delegate here. The service owns the order of
//! checks in every flow; the repositories own atomicity.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::application::ports::{EmailMessage, Mailer};
use crate::application::token_err;
use crate::domain::rbac::VerificationOutcome;
use crate::domain::{
    AccessRepositoryInterface, CreateUserDto, DomainError, DomainResult, RoleName, User,
    UserRepositoryInterface,
};
use crate::infrastructure::crypto::{IssuedToken, PasswordHasher, TokenCodec, TokenPurpose};
use crate::shared::{normalize_email, trimmed, validate_password, validate_username};

/// Generic answer to every reset request, whatever the account state.
pub const RESET_REQUEST_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent";

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session: IssuedToken,
    /// Seconds; also the cookie `Max-Age`.
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    AlreadyVerified,
}

/// Either half of the reset mail proves the request.
#[derive(Debug, Clone)]
pub enum PasswordResetCredential {
    /// The signed link token.
    Token(String),
    /// The one-time code stored on the account.
    Code { email: String, code: String },
}

/// Credentials for the bootstrap system administrator.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct IdentityService {
    users: Arc<dyn UserRepositoryInterface>,
    access: Arc<dyn AccessRepositoryInterface>,
    tokens: Arc<TokenCodec>,
    hasher: PasswordHasher,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl IdentityService {
    pub fn new(
        users: Arc<dyn UserRepositoryInterface>,
        access: Arc<dyn AccessRepositoryInterface>,
        tokens: Arc<TokenCodec>,
        hasher: PasswordHasher,
        mailer: Arc<dyn Mailer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            access,
            tokens,
            hasher,
            mailer,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    fn hash(&self, password: &str) -> DomainResult<String> {
        self.hasher.hash(password).map_err(|e| {
            error!(error = %e, "Password hashing failed");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })
    }

    async fn send_verification(&self, user: &User) -> DomainResult<()> {
        let issued = self
            .tokens
            .issue_email_verification(&user.id, &user.email)
            .map_err(token_err)?;
        self.users
            .set_verification_token(&user.id, Some(&issued.token))
            .await?;

        let link = format!("{}/api/v1/auth/verify/{}", self.base_url, issued.token);
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Verify your email address".into(),
            body: format!(
                "Hello {},\n\nConfirm your email address by opening the link below. \
                 It expires at {}.\n\n{}\n",
                user.username,
                issued.expires_at.to_rfc3339(),
                link
            ),
        };

        self.mailer.send(message).await.map_err(|e| {
            error!(user_id = %user.id, error = %e, "Verification mail failed");
            DomainError::Internal(e.to_string())
        })?;
        metrics::counter!("rbac_emails_sent_total", "kind" => "verification").increment(1);
        Ok(())
    }

    // ── Registration & verification ─────────────────────────────

    pub async fn register(&self, input: RegisterInput) -> DomainResult<User> {
        let username = validate_username(&input.username)?;
        let email = normalize_email(&input.email)?;
        validate_password(&input.password)?;

        if self.users.get_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }
        if self.users.get_user_by_username(&username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".into()));
        }

        let password_hash = self.hash(&input.password)?;
        let user = self
            .users
            .create_user(CreateUserDto {
                username,
                email,
                first_name: trimmed(input.first_name),
                last_name: trimmed(input.last_name),
                password_hash,
                user_type: RoleName::DEFAULT,
                email_verified: false,
            })
            .await?;

        // Undo the insert so the client can simply retry.
        if let Err(e) = self.send_verification(&user).await {
            if let Err(cleanup) = self.users.delete_user(&user.id).await {
                error!(user_id = %user.id, error = %cleanup, "Failed to roll back registration");
            }
            return Err(e);
        }

        info!(user_id = %user.id, username = %user.username, "New user registered");
        metrics::counter!("rbac_registrations_total").increment(1);
        Ok(user)
    }

    pub async fn verify_email(&self, token: &str) -> DomainResult<User> {
        let claims = self
            .tokens
            .validate(token, TokenPurpose::EmailVerification)
            .map_err(token_err)?;

        let user = self
            .users
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", claims.sub.as_str()))?;

        let assigned_by = self.access.find_user_with_role(RoleName::SystemAdmin).await?;
        if assigned_by.is_none() {
            warn!(user_id = %user.id, "No system administrator to attribute the role assignment to");
        }

        let outcome = self
            .access
            .complete_verification(&user.id, RoleName::DEFAULT, assigned_by.as_deref())
            .await?;
        match outcome {
            VerificationOutcome::Verified => info!(user_id = %user.id, "Email verified"),
            VerificationOutcome::AlreadyVerified => {
                info!(user_id = %user.id, "Email already verified")
            }
        }

        self.users
            .get_user_by_id(&user.id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "id", user.id.as_str()))
    }

    pub async fn resend_verification(&self, email: &str) -> DomainResult<ResendOutcome> {
        let email = normalize_email(email)?;
        let user = self
            .users
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::not_found("User", "email", email.as_str()))?;

        if user.email_verified {
            return Ok(ResendOutcome::AlreadyVerified);
        }

        self.send_verification(&user).await?;
        info!(user_id = %user.id, "Verification mail re-sent");
        Ok(ResendOutcome::Sent)
    }

    // ── Authentication ──────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> DomainResult<LoginResult> {
        let invalid = || DomainError::Unauthorized("Invalid credentials".into());

        let Ok(email) = normalize_email(email) else {
            return Err(invalid());
        };
        let Some(user) = self.users.get_user_by_email(&email).await? else {
            warn!("Login attempt for unknown email");
            return Err(invalid());
        };

        let matches = self.hasher.verify(password, &user.password_hash).map_err(|e| {
            error!(user_id = %user.id, error = %e, "Password verification failed");
            DomainError::Internal(format!("Failed to verify password: {}", e))
        })?;
        if !matches {
            warn!(user_id = %user.id, "Login rejected: wrong password");
            return Err(invalid());
        }

        if !user.email_verified {
            warn!(user_id = %user.id, "Login rejected: email not verified");
            return Err(DomainError::EmailNotVerified);
        }
        if !user.active {
            warn!(user_id = %user.id, "Login rejected: account disabled");
            return Err(DomainError::Forbidden("Account is disabled".into()));
        }

        let session = self
            .tokens
            .issue_session(&user.id, &user.username, user.user_type)
            .map_err(token_err)?;

        info!(user_id = %user.id, role = %user.user_type, "User logged in");
        metrics::counter!("rbac_logins_total").increment(1);

        Ok(LoginResult {
            session,
            expires_in: self.tokens.config().session_ttl.num_seconds(),
            user,
        })
    }

    // ── Password reset ──────────────────────────────────────────

    /// Always succeeds for a well-formed email; whether anything was sent is
    /// not observable by the caller.
    pub async fn request_password_reset(&self, email: &str) -> DomainResult<()> {
        let Ok(email) = normalize_email(email) else {
            return Ok(());
        };

        let user = match self.users.get_user_by_email(&email).await? {
            Some(user) if user.email_verified => user,
            _ => {
                warn!("Password reset requested for an unknown or unverified account");
                return Ok(());
            }
        };

        // A new request supersedes any link or code mailed earlier.
        let code = uuid::Uuid::new_v4().to_string();
        let issued = self
            .tokens
            .issue_password_reset(&user.id, &user.email, &code)
            .map_err(token_err)?;
        self.users
            .set_reset_token(&user.id, &code, issued.expires_at)
            .await?;
        let link = format!(
            "{}/api/v1/auth/password-reset-confirm?token={}",
            self.base_url, issued.token
        );
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Reset your password".into(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password:\n\n{}\n\n\
                 Or enter this code: {}\n\nBoth expire at {}.\n",
                user.username,
                link,
                code,
                issued.expires_at.to_rfc3339()
            ),
        };

        match self.mailer.send(message).await {
            Ok(()) => {
                info!(user_id = %user.id, "Password reset mail sent");
                metrics::counter!("rbac_emails_sent_total", "kind" => "password_reset")
                    .increment(1);
            }
            Err(e) => error!(user_id = %user.id, error = %e, "Password reset mail failed"),
        }
        Ok(())
    }

    pub async fn confirm_password_reset(
        &self,
        credential: PasswordResetCredential,
        new_password: &str,
    ) -> DomainResult<()> {
        let rejected = || DomainError::Unauthorized("Invalid or expired reset token".into());

        let (user, code) = match credential {
            PasswordResetCredential::Token(token) => {
                let claims = self
                    .tokens
                    .validate(&token, TokenPurpose::PasswordReset)
                    .map_err(token_err)?;
                let user = self.users.get_user_by_id(&claims.sub).await?.ok_or_else(rejected)?;
                if claims.email.as_deref() != Some(user.email.as_str()) {
                    return Err(rejected());
                }
                (user, claims.jti)
            }
            PasswordResetCredential::Code { email, code } => {
                let email = normalize_email(&email).map_err(|_| rejected())?;
                let user = self.users.get_user_by_email(&email).await?.ok_or_else(rejected)?;
                (user, code.trim().to_string())
            }
        };

        // The pending code is cleared on use and replaced by every new
        // request, so a used or superseded credential no longer matches.
        if user.reset_token.as_deref() != Some(code.as_str()) {
            warn!(user_id = %user.id, "Password reset rejected: no matching pending code");
            return Err(rejected());
        }
        match user.reset_expires_at {
            Some(expires_at) if expires_at > Utc::now() => {}
            _ => {
                warn!(user_id = %user.id, "Password reset rejected: code expired");
                return Err(rejected());
            }
        }
        if !user.email_verified {
            return Err(DomainError::EmailNotVerified);
        }

        validate_password(new_password)?;
        let password_hash = self.hash(new_password)?;
        self.users.update_user_password(&user.id, &password_hash).await?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    // ── Bootstrap ───────────────────────────────────────────────

    /// Create the configured system administrator when nobody holds that
    /// role yet. Returns the account when one was created.
    pub async fn bootstrap_system_admin(&self, account: &AdminAccount) -> DomainResult<Option<User>> {
        if let Some(existing) = self.access.find_user_with_role(RoleName::SystemAdmin).await? {
            info!(user_id = %existing, "System administrator already present");
            return Ok(None);
        }

        let username = validate_username(&account.username)?;
        let email = normalize_email(&account.email)?;
        if self.users.get_user_by_email(&email).await?.is_some()
            || self.users.get_user_by_username(&username).await?.is_some()
        {
            warn!(%username, "Bootstrap admin skipped: username or email already taken");
            return Ok(None);
        }

        let password_hash = self.hash(&account.password)?;
        let admin = self
            .access
            .create_self_assigned_user(CreateUserDto {
                username,
                email,
                first_name: None,
                last_name: None,
                password_hash,
                user_type: RoleName::SystemAdmin,
                email_verified: true,
            })
            .await?;

        info!(user_id = %admin.id, username = %admin.username, "System administrator created");
        Ok(Some(admin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{fixture, Fixture};
    use crate::infrastructure::crypto::JwtConfig;

    fn service(f: &Fixture) -> IdentityService {
        IdentityService::new(
            f.users.clone(),
            f.access.clone(),
            f.tokens.clone(),
            f.hasher.clone(),
            f.mailer.clone(),
            "http://localhost:8080/",
        )
    }

    fn alice() -> RegisterInput {
        RegisterInput {
            username: "alice".into(),
            email: "Alice@X.com".into(),
            password: "password123".into(),
            first_name: Some(" Alice ".into()),
            last_name: None,
        }
    }

    async fn registered_and_verified(f: &Fixture, svc: &IdentityService) -> User {
        svc.register(alice()).await.unwrap();
        let token = f.mailer.verification_token_for("alice@x.com").await.unwrap();
        svc.verify_email(&token).await.unwrap()
    }

    #[tokio::test]
    async fn register_stores_unverified_user_and_mails_link() {
        let f = fixture().await;
        let svc = service(&f);

        let user = svc.register(alice()).await.unwrap();
        assert_eq!(user.email, "alice@x.com");
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert!(!user.email_verified);
        assert_ne!(user.password_hash, "password123");

        let mail = f.mailer.last_to("alice@x.com").await.unwrap();
        assert!(mail
            .body
            .contains("http://localhost:8080/api/v1/auth/verify/"));
        let stored = f.users.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.verification_token.is_some());
    }

    #[tokio::test]
    async fn register_rejects_duplicates_and_bad_input() {
        let f = fixture().await;
        let svc = service(&f);
        svc.register(alice()).await.unwrap();

        let dup = svc.register(alice()).await.unwrap_err();
        assert!(matches!(dup, DomainError::Conflict(_)));

        let mut short = alice();
        short.email = "other@x.com".into();
        short.username = "other".into();
        short.password = "short".into();
        assert!(matches!(
            svc.register(short).await.unwrap_err(),
            DomainError::Validation(_)
        ));

        let mut bad_email = alice();
        bad_email.email = "not-an-email".into();
        assert!(matches!(
            svc.register(bad_email).await.unwrap_err(),
            DomainError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn mail_failure_rolls_back_registration() {
        let f = fixture().await;
        let svc = service(&f);
        f.mailer.fail_sends(true);
        assert!(matches!(
            svc.register(alice()).await.unwrap_err(),
            DomainError::Internal(_)
        ));
        assert!(f.users.get_user_by_email("alice@x.com").await.unwrap().is_none());

        f.mailer.fail_sends(false);
        let user = svc.register(alice()).await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn login_requires_verification() {
        let f = fixture().await;
        let svc = service(&f);
        svc.register(alice()).await.unwrap();

        let err = svc.login("alice@x.com", "password123").await.unwrap_err();
        assert!(matches!(err, DomainError::EmailNotVerified));

        let wrong = svc.login("alice@x.com", "nope-nope").await.unwrap_err();
        assert!(matches!(wrong, DomainError::Unauthorized(_)));

        let token = f.mailer.verification_token_for("alice@x.com").await.unwrap();
        svc.verify_email(&token).await.unwrap();

        let result = svc.login("ALICE@x.com", "password123").await.unwrap();
        assert_eq!(result.user.username, "alice");
        assert_eq!(result.expires_in, 24 * 3600);
        let claims = f
            .tokens
            .validate(&result.session.token, TokenPurpose::Session)
            .unwrap();
        assert_eq!(claims.role_name(), Some(RoleName::User));
    }

    #[tokio::test]
    async fn verification_is_idempotent() {
        let f = fixture().await;
        let svc = service(&f);
        let admin = svc
            .bootstrap_system_admin(&AdminAccount {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password: "adminpassword".into(),
            })
            .await
            .unwrap()
            .unwrap();

        svc.register(alice()).await.unwrap();
        let token = f.mailer.verification_token_for("alice@x.com").await.unwrap();

        let first = svc.verify_email(&token).await.unwrap();
        let second = svc.verify_email(&token).await.unwrap();
        assert!(first.email_verified && second.email_verified);
        assert!(first.verification_token.is_none());

        let assignment = f.access.assignment_for_user(&first.id).await.unwrap().unwrap();
        assert_eq!(assignment.role_name, "user");
        assert_eq!(assignment.assigned_by.as_deref(), Some(admin.id.as_str()));
    }

    #[tokio::test]
    async fn session_token_cannot_verify_email() {
        let f = fixture().await;
        let svc = service(&f);
        let user = svc.register(alice()).await.unwrap();
        let session = f
            .tokens
            .issue_session(&user.id, &user.username, RoleName::User)
            .unwrap();

        let err = svc.verify_email(&session.token).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn resend_only_while_unverified() {
        let f = fixture().await;
        let svc = service(&f);
        svc.register(alice()).await.unwrap();

        assert_eq!(
            svc.resend_verification("alice@x.com").await.unwrap(),
            ResendOutcome::Sent
        );
        assert_eq!(f.mailer.sent().await.len(), 2);

        let token = f.mailer.verification_token_for("alice@x.com").await.unwrap();
        svc.verify_email(&token).await.unwrap();
        assert_eq!(
            svc.resend_verification("alice@x.com").await.unwrap(),
            ResendOutcome::AlreadyVerified
        );
        assert_eq!(f.mailer.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn reset_request_does_not_reveal_accounts() {
        let f = fixture().await;
        let svc = service(&f);
        svc.register(alice()).await.unwrap();

        svc.request_password_reset("ghost@x.com").await.unwrap();
        svc.request_password_reset("alice@x.com").await.unwrap();

        // Only the verification mail; nothing for the unverified account.
        assert_eq!(f.mailer.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn reset_with_signed_token_is_single_use() {
        let f = fixture().await;
        let svc = service(&f);
        registered_and_verified(&f, &svc).await;

        svc.request_password_reset("alice@x.com").await.unwrap();
        let token = f.mailer.reset_token_for("alice@x.com").await.unwrap();

        svc.confirm_password_reset(PasswordResetCredential::Token(token.clone()), "newpassword1")
            .await
            .unwrap();
        svc.login("alice@x.com", "newpassword1").await.unwrap();

        let replay = svc
            .confirm_password_reset(PasswordResetCredential::Token(token), "another-pass")
            .await
            .unwrap_err();
        assert!(matches!(replay, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn reset_with_stored_code() {
        let f = fixture().await;
        let svc = service(&f);
        let user = registered_and_verified(&f, &svc).await;

        svc.request_password_reset("alice@x.com").await.unwrap();
        let code = f
            .users
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap()
            .reset_token
            .unwrap();
        assert!(f.mailer.last_to("alice@x.com").await.unwrap().body.contains(&code));

        let wrong = svc
            .confirm_password_reset(
                PasswordResetCredential::Code {
                    email: "alice@x.com".into(),
                    code: "wrong".into(),
                },
                "newpassword1",
            )
            .await
            .unwrap_err();
        assert!(matches!(wrong, DomainError::Unauthorized(_)));

        svc.confirm_password_reset(
            PasswordResetCredential::Code {
                email: "alice@x.com".into(),
                code,
            },
            "newpassword1",
        )
        .await
        .unwrap();
        svc.login("alice@x.com", "newpassword1").await.unwrap();
    }

    #[tokio::test]
    async fn used_link_stays_dead_after_a_new_request() {
        let f = fixture().await;
        let svc = service(&f);
        registered_and_verified(&f, &svc).await;

        svc.request_password_reset("alice@x.com").await.unwrap();
        let first = f.mailer.reset_token_for("alice@x.com").await.unwrap();
        svc.confirm_password_reset(PasswordResetCredential::Token(first.clone()), "newpassword1")
            .await
            .unwrap();

        svc.request_password_reset("alice@x.com").await.unwrap();
        let replay = svc
            .confirm_password_reset(PasswordResetCredential::Token(first), "hijacked-pass")
            .await
            .unwrap_err();
        assert!(matches!(replay, DomainError::Unauthorized(_)));
        svc.login("alice@x.com", "newpassword1").await.unwrap();

        // The link from the second mail still works.
        let second = f.mailer.reset_token_for("alice@x.com").await.unwrap();
        svc.confirm_password_reset(PasswordResetCredential::Token(second), "newpassword2")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn newer_request_supersedes_unused_link() {
        let f = fixture().await;
        let svc = service(&f);
        registered_and_verified(&f, &svc).await;

        svc.request_password_reset("alice@x.com").await.unwrap();
        let stale = f.mailer.reset_token_for("alice@x.com").await.unwrap();
        svc.request_password_reset("alice@x.com").await.unwrap();

        let err = svc
            .confirm_password_reset(PasswordResetCredential::Token(stale), "newpassword1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let f = fixture().await;
        let expired = Arc::new(TokenCodec::new(JwtConfig {
            secret: "test-secret".into(),
            reset_ttl: chrono::Duration::minutes(-1),
            ..JwtConfig::default()
        }));
        let svc = IdentityService::new(
            f.users.clone(),
            f.access.clone(),
            expired,
            f.hasher.clone(),
            f.mailer.clone(),
            "http://localhost:8080",
        );
        let user = registered_and_verified(&f, &svc).await;

        svc.request_password_reset("alice@x.com").await.unwrap();
        let stored = f.users.get_user_by_id(&user.id).await.unwrap().unwrap();
        let code = stored.reset_token.unwrap();
        assert!(stored.reset_expires_at.unwrap() < Utc::now());

        let token = f.mailer.reset_token_for("alice@x.com").await.unwrap();
        let by_token = svc
            .confirm_password_reset(PasswordResetCredential::Token(token), "newpassword1")
            .await
            .unwrap_err();
        assert!(matches!(by_token, DomainError::Unauthorized(_)));

        let by_code = svc
            .confirm_password_reset(
                PasswordResetCredential::Code {
                    email: "alice@x.com".into(),
                    code,
                },
                "newpassword1",
            )
            .await
            .unwrap_err();
        assert!(matches!(by_code, DomainError::Unauthorized(_)));
        svc.login("alice@x.com", "password123").await.unwrap();
    }

    #[tokio::test]
    async fn bootstrap_runs_once() {
        let f = fixture().await;
        let svc = service(&f);
        let account = AdminAccount {
            username: "admin".into(),
            email: "admin@example.com".into(),
            password: "adminpassword".into(),
        };

        let created = svc.bootstrap_system_admin(&account).await.unwrap().unwrap();
        assert!(created.is_system_admin());
        assert!(created.email_verified);
        assert!(svc.bootstrap_system_admin(&account).await.unwrap().is_none());

        let login = svc.login("admin@example.com", "adminpassword").await.unwrap();
        assert_eq!(login.user.user_type, RoleName::SystemAdmin);
    }
}
