//! Feature modules. Each owns its DTOs and handlers.

pub mod auth;
pub mod health;
pub mod me;
pub mod metrics;
pub mod permissions;
pub mod request_id;
pub mod roles;
pub mod users;
