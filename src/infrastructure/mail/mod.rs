//! Mail transports
//!
//! - [`LogMailer`]: writes each message to the tracing log. Used when no
//!   relay is reachable from the process (development, CI).
//! - [`MemoryMailer`]: keeps messages in memory so callers can read back
//!   the links that were sent.

mod log_mailer;
mod memory;

pub use log_mailer::{LogMailer, SmtpSettings};
pub use memory::MemoryMailer;
