pub mod outbound;

pub use outbound::{EmailMessage, MailError, Mailer};
