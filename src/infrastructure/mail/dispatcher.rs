use std::time::Duration;

use ammonia::clean_text;
use tokio::time::timeout;

use crate::{
    constants::{AUTO_REPLY_SUBJECT, OWNER_SUBJECT_PREFIX},
    entities::{
        contact::ContactSubmission,
        email::{MailAddress, MailReceipt, OutboundEmail},
    },
    errors::MailError,
    infrastructure::mail::transport::MailTransport,
    settings::AppConfig,
};

#[derive(Debug, Clone)]
pub struct MailerSettings {
    pub from: MailAddress,
    pub owner: MailAddress,
    /// Signature used on the auto-reply.
    pub owner_name: String,
    pub timeout: Duration,
}

impl From<&AppConfig> for MailerSettings {
    fn from(config: &AppConfig) -> Self {
        MailerSettings {
            from: MailAddress::named(config.mail_from_name.clone(), config.mail_from_address()),
            owner: MailAddress::new(config.owner_email.clone()),
            owner_name: config.owner_name.clone(),
            timeout: config.mail_timeout(),
        }
    }
}

/// Renders contact emails and hands them to the transport, one bounded call each.
pub struct MailDispatcher<T>
where
    T: MailTransport,
{
    pub transport: T,
    pub settings: MailerSettings,
}

impl<T> MailDispatcher<T>
where
    T: MailTransport,
{
    pub fn new(transport: T, settings: MailerSettings) -> Self {
        MailDispatcher { transport, settings }
    }

    /// Notifies the site owner. Replies go straight to the submitter.
    pub async fn send_contact_email(
        &self,
        submission: &ContactSubmission,
    ) -> Result<MailReceipt, MailError> {
        let email = render_owner_notification(&self.settings, submission);
        self.dispatch(email).await
    }

    /// Acknowledges receipt to the submitter. Only the name is echoed back.
    pub async fn send_auto_reply(
        &self,
        submission: &ContactSubmission,
    ) -> Result<MailReceipt, MailError> {
        let email = render_auto_reply(&self.settings, submission);
        self.dispatch(email).await
    }

    async fn dispatch(&self, email: OutboundEmail) -> Result<MailReceipt, MailError> {
        let limit = self.settings.timeout;
        match timeout(limit, self.transport.send(email)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::Timeout(limit.as_secs())),
        }
    }
}

pub fn render_owner_notification(
    settings: &MailerSettings,
    submission: &ContactSubmission,
) -> OutboundEmail {
    let text_body = format!(
        "New Contact Form Submission\n\n\
         From: {name}\n\
         Email: {email}\n\
         Subject: {subject}\n\n\
         Message:\n{message}\n\n\
         --\nThis email was sent from your portfolio contact form.\n",
        name = submission.name(),
        email = submission.email(),
        subject = submission.subject(),
        message = submission.message(),
    );

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #00d4ff; border-bottom: 2px solid #00d4ff; padding-bottom: 10px;">New Contact Form Submission</h2>
  <div style="margin: 20px 0;">
    <p><strong>From:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Subject:</strong> {subject}</p>
  </div>
  <div style="background: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <h3 style="margin-top: 0;">Message:</h3>
    <p style="white-space: pre-wrap;">{message}</p>
  </div>
  <p style="color: #666; font-size: 12px;">This email was sent from your portfolio contact form.</p>
</div>"#,
        name = clean_text(submission.name()),
        email = clean_text(submission.email()),
        subject = clean_text(submission.subject()),
        message = clean_text(submission.message()),
    );

    OutboundEmail {
        from: settings.from.clone(),
        to: settings.owner.clone(),
        reply_to: Some(MailAddress::named(submission.name(), submission.email())),
        subject: format!("{OWNER_SUBJECT_PREFIX}{}", submission.subject()),
        text_body,
        html_body,
    }
}

pub fn render_auto_reply(settings: &MailerSettings, submission: &ContactSubmission) -> OutboundEmail {
    let text_body = format!(
        "Hi {name},\n\n\
         Thank you for reaching out through my portfolio. I've received your message \
         and will get back to you as soon as possible.\n\n\
         Best regards,\n{owner}\n",
        name = submission.name(),
        owner = settings.owner_name,
    );

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #00d4ff;">Thank You for Getting in Touch!</h2>
  <p>Hi {name},</p>
  <p>Thank you for reaching out through my portfolio. I've received your message and will get back to you as soon as possible.</p>
  <p>Best regards,<br><strong>{owner}</strong></p>
</div>"#,
        name = clean_text(submission.name()),
        owner = clean_text(&settings.owner_name),
    );

    OutboundEmail {
        from: settings.from.clone(),
        to: MailAddress::named(submission.name(), submission.email()),
        reply_to: None,
        subject: AUTO_REPLY_SUBJECT.to_string(),
        text_body,
        html_body,
    }
}
