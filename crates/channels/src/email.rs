//! SMTP mail transport.
//!
//! The adapter validates configuration and shapes the message. Delivery only
//! counts as sent in the explicit dry-run mode; with `dry_run` off a deploy
//! gets a hard `NotConfigured` until a real SMTP client is wired in, so
//! outreach counts never overstate what actually left the building.

use async_trait::async_trait;
use emberline_config::EmailConfig;
use emberline_core::{ChannelError, Mailer, OutboundEmail};
use tracing::info;

#[derive(Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    user: String,
    password: String,
    from_address: String,
    dry_run: bool,
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("from_address", &self.from_address)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            user: config.smtp_user.clone(),
            password: config.smtp_password.clone(),
            from_address: config.from_address.clone(),
            dry_run: config.dry_run,
        }
    }

    fn configured(&self) -> bool {
        !self.host.is_empty() && !self.from_address.is_empty()
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), ChannelError> {
        if !self.configured() {
            return Err(ChannelError::NotConfigured("smtp".to_string()));
        }
        if email.to.is_empty() || !email.to.contains('@') {
            return Err(ChannelError::InvalidPayload(format!(
                "invalid recipient address: {:?}",
                email.to
            )));
        }
        if let Some(path) = &email.attachment {
            if !path.exists() {
                return Err(ChannelError::InvalidPayload(format!(
                    "attachment missing: {}",
                    path.display()
                )));
            }
        }

        // TODO: wire up a real SMTP client once the relay account exists.
        if !self.dry_run {
            return Err(ChannelError::NotConfigured("smtp transport".to_string()));
        }
        info!(
            relay = %self.host,
            port = self.port,
            from = %self.from_address,
            to = %email.to,
            subject = %email.subject,
            attachment = email.attachment.is_some(),
            "SMTP dry-run send"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer(host: &str) -> SmtpMailer {
        SmtpMailer::new(&EmailConfig {
            smtp_host: host.to_string(),
            smtp_port: 587,
            smtp_user: "outbound".to_string(),
            smtp_password: "hunter2".to_string(),
            from_address: "hello@emberline.example".to_string(),
            dry_run: true,
        })
    }

    fn email(to: &str) -> OutboundEmail {
        OutboundEmail {
            to: to.to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn missing_host_is_not_configured() {
        let err = mailer("").send(&email("a@b.c")).await.unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn malformed_recipient_is_rejected() {
        let err = mailer("smtp.example").send(&email("not-an-address")).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn missing_attachment_is_rejected() {
        let mut msg = email("a@b.c");
        msg.attachment = Some("/nonexistent/report.pdf".into());
        let err = mailer("smtp.example").send(&msg).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn dry_run_logs_and_reports_sent() {
        assert!(mailer("smtp.example").send(&email("a@b.c")).await.is_ok());
    }

    #[tokio::test]
    async fn live_mode_fails_until_a_transport_exists() {
        let config = EmailConfig {
            smtp_host: "smtp.example".to_string(),
            from_address: "hello@emberline.example".to_string(),
            dry_run: false,
            ..EmailConfig::default()
        };
        let err = SmtpMailer::new(&config)
            .send(&email("a@b.c"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::NotConfigured(_)));
    }

    #[test]
    fn debug_output_redacts_the_password() {
        let debug = format!("{:?}", mailer("smtp.example"));
        assert!(!debug.contains("hunter2"));
    }
}
