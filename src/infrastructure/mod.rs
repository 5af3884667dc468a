//! Infrastructure layer - external concerns

pub mod crypto;
pub mod database;
pub mod mail;

pub use crypto::{JwtConfig, PasswordHasher, TokenCodec};
pub use database::{init_database, DatabaseConfig};
pub use mail::{LogMailer, MemoryMailer, SmtpSettings};
