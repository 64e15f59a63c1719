//! Operator notifications.
//!
//! Notifications are best-effort: callers in the monitor log a failed [`Notifier::send`] and
//! carry on with the decision that triggered it.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no recipients configured")]
    NoRecipients,
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("delivery failed for all {0} recipient(s)")]
    AllFailed(usize),
}

#[derive(Debug, thiserror::Error)]
enum DeliveryError {
    #[error("address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("message build error: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;
}

/// Plain SMTP port used when no credentials are configured.
const SMTP_PORT: u16 = 25;
/// Submission port used with credentials (STARTTLS).
const SUBMISSION_PORT: u16 = 587;

/// Sends each notification as a separate plain-text mail to every configured recipient.
pub struct EmailNotifier {
    config: EmailConfig,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let port = resolve_port(&config);
        let mailer = match (&config.username, &config.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
                    .port(port)
                    .credentials(Credentials::new(user.clone(), pass.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
                .port(port)
                .build(),
        };
        Ok(Self { config, mailer })
    }

    async fn deliver(&self, recipient: &str, message: &str) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(self.config.from.parse()?)
            .to(recipient.parse()?)
            .subject(self.config.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_owned())?;
        self.mailer.send(email).await?;
        Ok(())
    }
}

fn resolve_port(config: &EmailConfig) -> u16 {
    match config.smtp_port {
        0 if config.username.as_deref().unwrap_or_default().is_empty() => SMTP_PORT,
        0 => SUBMISSION_PORT,
        port => port,
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        if self.config.to.is_empty() {
            return Err(NotifyError::NoRecipients);
        }
        let mut failed = 0;
        for recipient in &self.config.to {
            match self.deliver(recipient, message).await {
                Ok(()) => info!(to = %recipient, "email sent"),
                Err(e) => {
                    warn!(to = %recipient, "failed to send email: {e}");
                    failed += 1;
                }
            }
        }
        if failed == self.config.to.len() {
            return Err(NotifyError::AllFailed(failed));
        }
        Ok(())
    }
}
