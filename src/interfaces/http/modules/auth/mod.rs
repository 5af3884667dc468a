//! Authentication module: registration, verification, login, password reset

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
