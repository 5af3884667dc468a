use thiserror::Error;

/// Error taxonomy shared by every service and repository.
///
/// `Unauthorized` is an authentication failure (no or bad credentials) and
/// `Forbidden` an authorization failure (identity known, action denied).
/// The HTTP layer keeps the two apart.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        DomainError::NotFound {
            entity,
            field,
            value: value.into(),
        }
    }

    /// Message safe to hand back to a caller. Internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::NotFound { entity, .. } => format!("{} not found", entity),
            DomainError::Validation(msg)
            | DomainError::Conflict(msg)
            | DomainError::Unauthorized(msg)
            | DomainError::Forbidden(msg) => msg.clone(),
            DomainError::EmailNotVerified => "email not verified".to_string(),
            DomainError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_details_are_not_public() {
        let err = DomainError::Internal("connection refused on 10.0.0.3".into());
        assert_eq!(err.public_message(), "Internal server error");
        assert!(err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = DomainError::not_found("User", "id", "42");
        assert_eq!(err.public_message(), "User not found");
        assert_eq!(err.to_string(), "Not found: User with id=42");
    }
}
