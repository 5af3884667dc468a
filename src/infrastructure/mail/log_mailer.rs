use std::fmt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::application::ports::{EmailMessage, MailError, Mailer};

/// Relay settings from the `[email]` config section.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub secure: bool,
}

impl SmtpSettings {
    /// Relay login, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.password.is_empty() {
            None
        } else {
            Some((self.username.as_str(), self.password.as_str()))
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("from", &self.from)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Writes an audit line per message instead of talking to a relay.
/// Bodies carry live tokens and codes and never reach the log.
pub struct LogMailer {
    settings: SmtpSettings,
}

impl LogMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        if !settings.username.is_empty() && settings.password.is_empty() {
            warn!(username = %settings.username, "Mail relay username set without a password");
        }
        info!(
            host = %settings.host,
            port = settings.port,
            secure = settings.secure,
            authenticated = settings.credentials().is_some(),
            "Outgoing mail is written to the log"
        );
        Self { settings }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if message.to.trim().is_empty() {
            return Err(MailError("empty recipient".into()));
        }
        info!(
            from = %self.settings.from,
            to = %message.to,
            subject = %message.subject,
            "Email dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "localhost".into(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "noreply@example.com".into(),
            secure: false,
        }
    }

    fn mailer() -> LogMailer {
        LogMailer::new(settings())
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn accepts_addressed_messages() {
        let msg = EmailMessage {
            to: "alice@x.com".into(),
            subject: "hi".into(),
            body: "hello".into(),
        };
        assert!(mailer().send(msg).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_missing_recipient() {
        let msg = EmailMessage {
            to: " ".into(),
            subject: "hi".into(),
            body: "hello".into(),
        };
        assert!(mailer().send(msg).await.is_err());
    }

    #[test]
    fn body_never_reaches_the_log() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime
            .block_on(mailer().send(EmailMessage {
                to: "alice@x.com".into(),
                subject: "Reset your password".into(),
                body: "Or enter this code: 5f1c-secret-code".into(),
            }))
            .unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("alice@x.com"), "{}", output);
        assert!(output.contains("Reset your password"));
        assert!(!output.contains("5f1c-secret-code"), "{}", output);
    }

    #[test]
    fn credentials_need_both_halves_and_stay_masked() {
        let mut relay = settings();
        relay.username = "mailer".into();
        assert!(relay.credentials().is_none());

        relay.password = "relay-pass".into();
        assert_eq!(relay.credentials(), Some(("mailer", "relay-pass")));
        assert!(!format!("{:?}", relay).contains("relay-pass"));
    }
}
