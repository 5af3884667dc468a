//! User management: profile reads and updates, the two-step deletion.

pub mod service;

pub use service::UserService;
