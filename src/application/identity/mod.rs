//! Identity module: the account lifecycle
//!
//! Registration, email verification, login, password reset and the
//! start-up creation of the first system administrator.

pub mod service;

pub use service::{
    AdminAccount, IdentityService, LoginResult, PasswordResetCredential, RegisterInput,
    ResendOutcome, RESET_REQUEST_MESSAGE,
};
