//! User management module: profiles, deletion and role transitions

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
