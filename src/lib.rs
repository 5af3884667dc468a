//! # RBAC Service
//!
//! Identity lifecycle (registration, email verification, login, password
//! reset) and role-based access control behind a JSON HTTP API.
//!
//! ## Architecture
//!
//! - **domain**: users, the role hierarchy and transition table, permission sets
//! - **application**: identity, user and access-administration services
//! - **infrastructure**: sea-orm persistence, token codec, password hashing, mail
//! - **interfaces**: axum router, session and permission middleware
//! - **server**: runtime wiring and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};
pub use infrastructure::{init_database, DatabaseConfig};
pub use interfaces::http::{create_api_router, AppState};
pub use server::{build_app_state, init_tracing, ServerHandle, ServerOptions};
