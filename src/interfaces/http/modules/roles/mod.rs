//! Role administration and role/permission grants

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
