use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MessageBuilder, MultiPart},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::{
    entities::email::{MailAddress, MailReceipt, OutboundEmail},
    errors::MailError,
    infrastructure::mail::transport::MailTransport,
    settings::AppConfig,
};

/// SMTP relay transport backed by a pooled `lettre` connection.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    message_id_domain: String,
}

impl SmtpMailer {
    pub fn new(config: &AppConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.clone(),
        );

        let builder = if config.smtp_starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        };
        let builder = match config.smtp_port {
            Some(port) => builder.port(port),
            None => builder,
        };

        let message_id_domain = config
            .mail_from_address()
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| "localhost".to_string());

        Ok(SmtpMailer {
            transport: builder.credentials(credentials).build(),
            message_id_domain,
        })
    }
}

fn mailbox(address: &MailAddress) -> Result<Mailbox, MailError> {
    let parsed: Address = address.address.parse()?;
    Ok(Mailbox::new(address.name.clone(), parsed))
}

/// Builds the MIME message: plain text and HTML alternatives of the same content.
pub fn build_message(email: OutboundEmail, message_id: String) -> Result<Message, MailError> {
    let builder: MessageBuilder = Message::builder()
        .message_id(Some(message_id))
        .from(mailbox(&email.from)?)
        .to(mailbox(&email.to)?)
        .subject(email.subject);

    let builder = match &email.reply_to {
        Some(reply_to) => builder.reply_to(mailbox(reply_to)?),
        None => builder,
    };

    let message = builder.multipart(MultiPart::alternative_plain_html(
        email.text_body,
        email.html_body,
    ))?;

    Ok(message)
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: OutboundEmail) -> Result<MailReceipt, MailError> {
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.message_id_domain);
        let message = build_message(email, message_id.clone())?;

        let response = self.transport.send(message).await?;
        if !response.is_positive() {
            return Err(MailError::Rejected(response.code().to_string()));
        }

        Ok(MailReceipt { message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> OutboundEmail {
        OutboundEmail {
            from: MailAddress::named("Portfolio", "mailer@example.com"),
            to: MailAddress::new("owner@example.com"),
            reply_to: Some(MailAddress::new("jane@example.com")),
            subject: "Portfolio Contact: Hello".into(),
            text_body: "Hi there".into(),
            html_body: "<p>Hi there</p>".into(),
        }
    }

    #[test]
    fn message_carries_headers() {
        let message = build_message(email(), "<id@example.com>".into()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Message-ID: <id@example.com>"));
        assert!(raw.contains("Reply-To: jane@example.com"));
        assert!(raw.contains("To: owner@example.com"));
        assert!(raw.contains("Subject: Portfolio Contact: Hello"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[test]
    fn rejects_unparseable_recipient() {
        let mut bad = email();
        bad.to = MailAddress::new("not an address");
        assert!(matches!(
            build_message(bad, "<id@example.com>".into()),
            Err(MailError::InvalidAddress(_))
        ));
    }
}
