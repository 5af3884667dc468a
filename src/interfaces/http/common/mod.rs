//! Shared HTTP building blocks: the response envelope, error mapping,
//! session cookies and the validating JSON extractor.

pub mod cookie;
pub mod response;
pub mod validated_json;

pub use cookie::{clear_session_cookie, session_cookie, session_token_from_cookies, SESSION_COOKIE};
pub use response::{ApiError, ApiResponse, ApiResult, PaginatedResponse};
pub use validated_json::ValidatedJson;
