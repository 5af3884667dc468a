//! Handler state shared by every `/api/v1` route.

use std::sync::Arc;

use crate::application::{AccessAdminService, AuthorizationEvaluator, IdentityService, UserService};
use crate::infrastructure::crypto::TokenCodec;

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub users: Arc<UserService>,
    pub admin: Arc<AccessAdminService>,
    pub evaluator: AuthorizationEvaluator,
    pub tokens: Arc<TokenCodec>,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
}
