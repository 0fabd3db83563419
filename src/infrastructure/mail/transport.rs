use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    entities::email::{MailReceipt, OutboundEmail},
    errors::MailError,
};

/// Outbound mail capability. Accepts a composed message and returns the
/// provider's message id, or the reason it could not be handed over.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<MailReceipt, MailError>;
}

pub type SharedMailTransport = Arc<dyn MailTransport>;

#[async_trait]
impl<T> MailTransport for Arc<T>
where
    T: MailTransport + ?Sized,
{
    async fn send(&self, email: OutboundEmail) -> Result<MailReceipt, MailError> {
        (**self).send(email).await
    }
}

/// Writes messages to the log instead of delivering them. Used outside
/// production when no SMTP account is configured.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl MailTransport for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<MailReceipt, MailError> {
        let message_id = format!("<{}@log.invalid>", Uuid::new_v4());
        tracing::info!(
            message_id = %message_id,
            to = %email.to.address,
            reply_to = ?email.reply_to.as_ref().map(|r| r.address.as_str()),
            subject = %email.subject,
            "Mail transport disabled, message logged instead of sent"
        );
        tracing::debug!(body = %email.text_body, "Logged message body");
        Ok(MailReceipt { message_id })
    }
}
