pub mod jwt;
pub mod password;

pub use jwt::{IssuedToken, JwtConfig, TokenClaims, TokenCodec, TokenError, TokenPayload, TokenPurpose};
pub use password::{PasswordError, PasswordHasher};
