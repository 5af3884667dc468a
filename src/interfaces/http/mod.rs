//! HTTP REST API
//!
//! - `common`: envelope, error mapping, session cookie, `ValidatedJson`
//! - `middleware`: session authentication, permission and role guards
//! - `modules`: one module per resource (DTOs + handlers)
//! - `router`: route table and Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;

pub use router::{create_api_router, ApiDoc};
pub use state::AppState;
