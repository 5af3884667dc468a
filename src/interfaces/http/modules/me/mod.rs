//! The caller's own session

pub mod handlers;

pub use handlers::*;
