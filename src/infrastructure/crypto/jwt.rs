//! Signed, purpose-tagged tokens
//!
//! One HMAC secret signs three kinds of token: session, email verification
//! and password reset. Every token carries a `purpose` claim and
//! [`TokenCodec::validate`] refuses a token minted for a different flow, so a
//! verification link can never be replayed as a session and vice versa.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RoleName;

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Issuer claim
    pub issuer: String,
    /// Session lifetime. The session cookie uses the same value.
    pub session_ttl: Duration,
    pub verification_ttl: Duration,
    pub reset_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            issuer: "rbac-service".to_string(),
            session_ttl: Duration::hours(24),
            verification_ttl: Duration::minutes(5),
            reset_ttl: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    EmailVerification,
    PasswordReset,
}

/// What a token is minted for. The purpose follows from the variant.
#[derive(Debug, Clone)]
pub enum TokenPayload {
    Session {
        user_id: String,
        username: String,
        role: RoleName,
    },
    EmailVerification {
        user_id: String,
        email: String,
    },
    /// `code` becomes the `jti` and must match the code stored on the
    /// account when the token is redeemed.
    PasswordReset {
        user_id: String,
        email: String,
        code: String,
    },
}

impl TokenPayload {
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            TokenPayload::Session { .. } => TokenPurpose::Session,
            TokenPayload::EmailVerification { .. } => TokenPurpose::EmailVerification,
            TokenPayload::PasswordReset { .. } => TokenPurpose::PasswordReset,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub purpose: TokenPurpose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
    /// Unique token id
    pub jti: String,
}

impl TokenClaims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }

    /// Role of a session token. Present on every token that passed
    /// [`TokenCodec::validate`] with [`TokenPurpose::Session`].
    pub fn role_name(&self) -> Option<RoleName> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token was not issued for this purpose")]
    WrongPurpose,
    #[error("failed to sign token: {0}")]
    Encoding(String),
}

/// A freshly signed token and when it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenCodec {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn issue(&self, payload: TokenPayload, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let purpose = payload.purpose();

        let (sub, username, role, email, jti) = match payload {
            TokenPayload::Session {
                user_id,
                username,
                role,
            } => (user_id, Some(username), Some(role.as_str().to_string()), None, None),
            TokenPayload::EmailVerification { user_id, email } => {
                (user_id, None, None, Some(email), None)
            }
            TokenPayload::PasswordReset {
                user_id,
                email,
                code,
            } => (user_id, None, None, Some(email), Some(code)),
        };

        let claims = TokenClaims {
            sub,
            purpose,
            username,
            role,
            email,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.config.issuer.clone(),
            jti: jti.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn issue_session(
        &self,
        user_id: &str,
        username: &str,
        role: RoleName,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(
            TokenPayload::Session {
                user_id: user_id.to_string(),
                username: username.to_string(),
                role,
            },
            self.config.session_ttl,
        )
    }

    pub fn issue_email_verification(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(
            TokenPayload::EmailVerification {
                user_id: user_id.to_string(),
                email: email.to_string(),
            },
            self.config.verification_ttl,
        )
    }

    pub fn issue_password_reset(
        &self,
        user_id: &str,
        email: &str,
        code: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(
            TokenPayload::PasswordReset {
                user_id: user_id.to_string(),
                email: email.to_string(),
                code: code.to_string(),
            },
            self.config.reset_ttl,
        )
    }

    /// Check signature, issuer, expiry (no leeway) and purpose.
    pub fn validate(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.config.issuer]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidIssuer => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        if claims.purpose != expected {
            return Err(TokenError::WrongPurpose);
        }

        let complete = match claims.purpose {
            TokenPurpose::Session => claims.username.is_some() && claims.role_name().is_some(),
            TokenPurpose::EmailVerification | TokenPurpose::PasswordReset => {
                claims.email.is_some()
            }
        };
        if !complete {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(JwtConfig {
            secret: "test-secret".into(),
            ..JwtConfig::default()
        })
    }

    #[test]
    fn test_create_and_verify_token() {
        let codec = codec();
        let issued = codec
            .issue_session("user-123", "testuser", RoleName::Admin)
            .unwrap();

        let claims = codec.validate(&issued.token, TokenPurpose::Session).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.username.as_deref(), Some("testuser"));
        assert_eq!(claims.role_name(), Some(RoleName::Admin));
        assert_eq!(claims.exp - claims.iat, Duration::hours(24).num_seconds());
        assert_eq!(claims.expires_at().timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_invalid_token() {
        assert_eq!(
            codec().validate("invalid-token", TokenPurpose::Session).unwrap_err(),
            TokenError::Malformed
        );
    }

    #[test]
    fn purposes_do_not_cross() {
        let codec = codec();
        let verification = codec
            .issue_email_verification("u1", "alice@x.com")
            .unwrap()
            .token;
        let session = codec.issue_session("u1", "alice", RoleName::User).unwrap().token;
        let reset = codec
            .issue_password_reset("u1", "alice@x.com", "code-1")
            .unwrap()
            .token;

        assert_eq!(
            codec.validate(&verification, TokenPurpose::Session).unwrap_err(),
            TokenError::WrongPurpose
        );
        assert_eq!(
            codec.validate(&session, TokenPurpose::EmailVerification).unwrap_err(),
            TokenError::WrongPurpose
        );
        assert_eq!(
            codec.validate(&reset, TokenPurpose::EmailVerification).unwrap_err(),
            TokenError::WrongPurpose
        );

        let claims = codec
            .validate(&verification, TokenPurpose::EmailVerification)
            .unwrap();
        assert_eq!(claims.email.as_deref(), Some("alice@x.com"));
        assert!(claims.username.is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let codec = codec();
        let token = codec
            .issue(
                TokenPayload::PasswordReset {
                    user_id: "u1".into(),
                    email: "alice@x.com".into(),
                    code: "code-1".into(),
                },
                Duration::seconds(-30),
            )
            .unwrap()
            .token;
        assert_eq!(
            codec.validate(&token, TokenPurpose::PasswordReset).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let other = TokenCodec::new(JwtConfig {
            secret: "another-secret".into(),
            ..JwtConfig::default()
        });
        let token = other.issue_session("u1", "mallory", RoleName::SystemAdmin).unwrap().token;
        assert_eq!(
            codec().validate(&token, TokenPurpose::Session).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn reset_token_carries_its_code() {
        let codec = codec();
        let token = codec
            .issue_password_reset("u1", "alice@x.com", "code-1")
            .unwrap()
            .token;
        let claims = codec.validate(&token, TokenPurpose::PasswordReset).unwrap();
        assert_eq!(claims.jti, "code-1");
    }

    #[test]
    fn tokens_are_unique() {
        let codec = codec();
        let a = codec.issue_session("u1", "alice", RoleName::User).unwrap().token;
        let b = codec.issue_session("u1", "alice", RoleName::User).unwrap().token;
        assert_ne!(a, b);
    }
}
