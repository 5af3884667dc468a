//! Application layer: use-case orchestration over the domain traits.

pub mod access;
pub mod identity;
pub mod ports;
pub mod users;

pub use access::{AccessAdminService, AuthorizationEvaluator, NewPermissionInput};
pub use identity::{
    AdminAccount, IdentityService, LoginResult, PasswordResetCredential, RegisterInput,
    ResendOutcome,
};
pub use ports::{EmailMessage, MailError, Mailer};
pub use users::UserService;

use crate::domain::{DomainError, RoleName};
use crate::infrastructure::crypto::TokenError;

/// Who is performing an operation, with the role currently held in the store.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: String,
    pub role: RoleName,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: RoleName) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

pub(crate) fn token_err(err: TokenError) -> DomainError {
    match err {
        TokenError::Encoding(e) => DomainError::Internal(format!("token signing failed: {}", e)),
        TokenError::Expired => DomainError::Unauthorized("Token has expired".into()),
        TokenError::WrongPurpose => {
            DomainError::Unauthorized("Token was not issued for this operation".into())
        }
        TokenError::Malformed | TokenError::InvalidSignature => {
            DomainError::Unauthorized("Invalid token".into())
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Wiring over a migrated in-memory SQLite database.

    use std::sync::Arc;

    use sea_orm::{Database, DatabaseConnection};

    use crate::domain::{
        AccessRepositoryInterface, PermissionRepositoryInterface, RoleRepositoryInterface,
        UserRepositoryInterface,
    };
    use crate::infrastructure::crypto::{JwtConfig, PasswordHasher, TokenCodec};
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use crate::infrastructure::database::repositories::{
        AccessRepository, PermissionRepository, RoleRepository, UserRepository,
    };
    use crate::infrastructure::mail::MemoryMailer;

    pub struct Fixture {
        pub db: DatabaseConnection,
        pub users: Arc<dyn UserRepositoryInterface>,
        pub access: Arc<dyn AccessRepositoryInterface>,
        pub roles: Arc<dyn RoleRepositoryInterface>,
        pub permissions: Arc<dyn PermissionRepositoryInterface>,
        pub tokens: Arc<TokenCodec>,
        pub hasher: PasswordHasher,
        pub mailer: Arc<MemoryMailer>,
    }

    pub async fn fixture() -> Fixture {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        Fixture {
            users: Arc::new(UserRepository::new(db.clone())),
            access: Arc::new(AccessRepository::new(db.clone())),
            roles: Arc::new(RoleRepository::new(db.clone())),
            permissions: Arc::new(PermissionRepository::new(db.clone())),
            tokens: Arc::new(TokenCodec::new(JwtConfig {
                secret: "test-secret".into(),
                ..JwtConfig::default()
            })),
            hasher: PasswordHasher::new(4),
            mailer: Arc::new(MemoryMailer::new()),
            db,
        }
    }
}
