use crate::{
    constants::CONTACT_ACCEPTED_MESSAGE,
    entities::contact::{ContactAcceptedResponse, ContactRequest, ContactSubmission},
    errors::AppError,
    mail::{dispatcher::MailDispatcher, transport::MailTransport},
};

pub struct ContactHandler<T>
where
    T: MailTransport,
{
    pub dispatcher: MailDispatcher<T>,
}

impl<T> ContactHandler<T>
where
    T: MailTransport,
{
    pub fn new(dispatcher: MailDispatcher<T>) -> Self {
        ContactHandler { dispatcher }
    }

    /// Validates a submission and relays it: owner notification first, then the
    /// auto-reply. Only the owner notification can fail the request.
    ///
    /// Rate limiting happens before this is called, in the route middleware.
    pub async fn submit_contact_message(
        &self,
        request: ContactRequest,
    ) -> Result<ContactAcceptedResponse, AppError> {
        let submission = ContactSubmission::try_from(request)?;

        let receipt = self.dispatcher
            .send_contact_email(&submission)
            .await
            .map_err(|e| {
                tracing::error!("Failed to deliver contact notification: {}", e);
                AppError::from(e)
            })?;

        tracing::info!(message_id = %receipt.message_id, "Contact notification delivered");

        match self.dispatcher.send_auto_reply(&submission).await {
            Ok(receipt) => {
                tracing::info!(message_id = %receipt.message_id, "Auto-reply delivered");
            }
            Err(e) => {
                tracing::warn!("Auto-reply failed, continuing: {}", e);
            }
        }

        Ok(ContactAcceptedResponse {
            success: true,
            message: CONTACT_ACCEPTED_MESSAGE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockall::{predicate::function, Sequence};

    use super::*;
    use crate::{
        entities::email::{MailAddress, MailReceipt, OutboundEmail},
        errors::MailError,
        mail::{dispatcher::MailerSettings, transport::MockMailTransport},
    };

    fn handler(transport: MockMailTransport) -> ContactHandler<MockMailTransport> {
        ContactHandler::new(MailDispatcher::new(
            transport,
            MailerSettings {
                from: MailAddress::named("Portfolio", "mailer@example.com"),
                owner: MailAddress::new("owner@example.com"),
                owner_name: "Site Owner".into(),
                timeout: Duration::from_secs(1),
            },
        ))
    }

    fn request() -> ContactRequest {
        ContactRequest::new("Jane Doe", "jane@example.com", "Hello", "Hi there")
    }

    fn to_owner(email: &OutboundEmail) -> bool {
        email.to.address == "owner@example.com"
    }

    fn to_sender(email: &OutboundEmail) -> bool {
        email.to.address == "jane@example.com"
    }

    fn receipt(id: &str) -> Result<MailReceipt, MailError> {
        Ok(MailReceipt { message_id: id.into() })
    }

    #[tokio::test]
    async fn accepted_submission_sends_notification_then_auto_reply() {
        let mut seq = Sequence::new();
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .with(function(to_owner))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| receipt("<owner@example.com>"));
        transport
            .expect_send()
            .with(function(to_sender))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| receipt("<reply@example.com>"));

        let response = handler(transport).submit_contact_message(request()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.message, CONTACT_ACCEPTED_MESSAGE);
    }

    #[tokio::test]
    async fn invalid_submission_sends_nothing() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().never();

        let mut bad = request();
        bad.email = Some("not-an-email".into());

        let result = handler(transport).submit_contact_message(bad).await;
        assert!(matches!(result, Err(AppError::ValidationError(ref e)) if e[0].field == "email"));
    }

    #[tokio::test]
    async fn owner_notification_failure_is_fatal_and_skips_auto_reply() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .with(function(to_owner))
            .times(1)
            .returning(|_| Err(MailError::Transport("connection refused".into())));
        transport.expect_send().with(function(to_sender)).never();

        let result = handler(transport).submit_contact_message(request()).await;
        assert!(matches!(result, Err(AppError::DispatchError(Some(_)))));
    }

    #[tokio::test]
    async fn auto_reply_failure_is_not_fatal() {
        let mut transport = MockMailTransport::new();
        transport
            .expect_send()
            .with(function(to_owner))
            .times(1)
            .returning(|_| receipt("<owner@example.com>"));
        transport
            .expect_send()
            .with(function(to_sender))
            .times(1)
            .returning(|_| Err(MailError::Rejected("550".into())));

        let response = handler(transport).submit_contact_message(request()).await.unwrap();
        assert!(response.success);
    }

    #[tokio::test]
    async fn identical_submissions_are_not_deduplicated() {
        let mut transport = MockMailTransport::new();
        transport.expect_send().times(4).returning(|_| receipt("<id@example.com>"));

        let handler = handler(transport);
        handler.submit_contact_message(request()).await.unwrap();
        handler.submit_contact_message(request()).await.unwrap();
    }
}
