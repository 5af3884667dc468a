use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{EmailMessage, MailError, Mailer};

#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail.
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn last_to(&self, address: &str) -> Option<EmailMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.to == address)
            .cloned()
    }

    /// Path segment following `/verify/` in the latest mail to `address`.
    pub async fn verification_token_for(&self, address: &str) -> Option<String> {
        let mail = self.last_to(address).await?;
        extract_after(&mail.body, "/verify/")
    }

    /// Signed reset token from the latest reset mail to `address`.
    pub async fn reset_token_for(&self, address: &str) -> Option<String> {
        let mail = self.last_to(address).await?;
        extract_after(&mail.body, "token=")
    }
}

fn extract_after(body: &str, marker: &str) -> Option<String> {
    let start = body.find(marker)? + marker.len();
    let token: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError("relay unavailable".into()));
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_links() {
        let mailer = MemoryMailer::new();
        mailer
            .send(EmailMessage {
                to: "alice@x.com".into(),
                subject: "Verify".into(),
                body: "Open http://localhost/api/v1/auth/verify/abc.def-ghi_1 now".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            mailer.verification_token_for("alice@x.com").await.as_deref(),
            Some("abc.def-ghi_1")
        );
        assert!(mailer.reset_token_for("alice@x.com").await.is_none());
        assert!(mailer.last_to("bob@x.com").await.is_none());
    }

    #[tokio::test]
    async fn can_simulate_outage() {
        let mailer = MemoryMailer::new();
        mailer.fail_sends(true);
        let result = mailer
            .send(EmailMessage {
                to: "alice@x.com".into(),
                subject: "s".into(),
                body: "b".into(),
            })
            .await;
        assert!(result.is_err());
        assert!(mailer.sent().await.is_empty());
    }
}
