//! Password hashing utilities

use bcrypt::{hash, verify, DEFAULT_COST};

pub type PasswordError = bcrypt::BcryptError;

/// Salted bcrypt hashing. The salt is random per call and embedded in the
/// output, so hashing the same password twice gives different strings.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash(password, self.cost)
    }

    /// A stored value that is not a bcrypt hash is an error, not a mismatch.
    pub fn verify(&self, password: &str, hashed: &str) -> Result<bool, PasswordError> {
        verify(password, hashed)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let password = "secure_password_123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(password, &hashed).unwrap());
        assert!(!hasher.verify("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn salts_differ() {
        let hasher = PasswordHasher::new(4);
        assert_ne!(hasher.hash("password123").unwrap(), hasher.hash("password123").unwrap());
    }

    #[test]
    fn corrupt_hash_is_an_error() {
        assert!(PasswordHasher::new(4).verify("x", "not-a-hash").is_err());
    }

    #[test]
    fn default_cost_is_conservative() {
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }
}
