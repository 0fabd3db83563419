use std::time::{Duration, Instant};

use derive_more::Display;

use super::http::{ContactClient, SubmitFailure};
use crate::entities::contact::{ContactAcceptedResponse, ContactRequest};

/// How long a success or error banner stays up before the form goes back to idle.
pub const STATUS_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);

pub const SUBMIT_FAILED_MESSAGE: &str =
    "Failed to send message. Please try again or email me directly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Email,
    Subject,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Success(String),
    Error(SubmitFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum FormError {
    #[display("A submission is already in flight")]
    AlreadySubmitting,

    #[display("No submission is in flight")]
    NotSubmitting,
}

impl std::error::Error for FormError {}

/// Client-side contact form.
///
/// `Idle -> Submitting -> Success | Error`, with the terminal states
/// falling back to `Idle` after [`STATUS_DISPLAY_TIMEOUT`] or as soon as
/// the visitor edits a field. Only one submission can be in flight.
#[derive(Debug, Clone)]
pub struct ContactFormState {
    name: String,
    email: String,
    subject: String,
    message: String,
    status: FormStatus,
    status_since: Option<Instant>,
    display_timeout: Duration,
}

impl Default for ContactFormState {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactFormState {
    pub fn new() -> Self {
        Self::with_display_timeout(STATUS_DISPLAY_TIMEOUT)
    }

    pub fn with_display_timeout(display_timeout: Duration) -> Self {
        ContactFormState {
            name: String::new(),
            email: String::new(),
            subject: String::new(),
            message: String::new(),
            status: FormStatus::Idle,
            status_since: None,
            display_timeout,
        }
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == FormStatus::Submitting
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Email => &self.email,
            FormField::Subject => &self.subject,
            FormField::Message => &self.message,
        }
    }

    /// Edits are ignored while a submission is in flight.
    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        if self.is_submitting() {
            return;
        }

        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Email => &mut self.email,
            FormField::Subject => &mut self.subject,
            FormField::Message => &mut self.message,
        };
        *slot = value.into();

        if matches!(self.status, FormStatus::Success(_) | FormStatus::Error(_)) {
            self.reset_status();
        }
    }

    pub fn request(&self) -> ContactRequest {
        ContactRequest::new(
            self.name.clone(),
            self.email.clone(),
            self.subject.clone(),
            self.message.clone(),
        )
    }

    pub fn begin_submit(&mut self, now: Instant) -> Result<ContactRequest, FormError> {
        if self.is_submitting() {
            return Err(FormError::AlreadySubmitting);
        }
        self.status = FormStatus::Submitting;
        self.status_since = Some(now);
        Ok(self.request())
    }

    /// Clears the fields on success; keeps them on failure so the visitor can retry.
    pub fn finish(
        &mut self,
        result: Result<ContactAcceptedResponse, SubmitFailure>,
        now: Instant,
    ) -> Result<(), FormError> {
        if !self.is_submitting() {
            return Err(FormError::NotSubmitting);
        }

        self.status = match result {
            Ok(accepted) => {
                self.name.clear();
                self.email.clear();
                self.subject.clear();
                self.message.clear();
                FormStatus::Success(accepted.message)
            }
            Err(failure) => FormStatus::Error(failure),
        };
        self.status_since = Some(now);
        Ok(())
    }

    /// Returns `true` if a success or error banner timed out and was cleared.
    pub fn expire_status(&mut self, now: Instant) -> bool {
        let shown = matches!(self.status, FormStatus::Success(_) | FormStatus::Error(_));
        let expired = self
            .status_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.display_timeout);

        if shown && expired {
            self.reset_status();
            return true;
        }
        false
    }

    pub async fn submit(&mut self, client: &ContactClient) -> Result<&FormStatus, FormError> {
        let request = self.begin_submit(Instant::now())?;
        let result = client.send(&request).await;
        self.finish(result, Instant::now())?;
        Ok(&self.status)
    }

    /// Banner text for the current status, if any.
    pub fn status_message(&self) -> Option<String> {
        match &self.status {
            FormStatus::Idle | FormStatus::Submitting => None,
            FormStatus::Success(message) => Some(message.clone()),
            FormStatus::Error(SubmitFailure::RateLimited { message, .. }) => Some(message.clone()),
            FormStatus::Error(SubmitFailure::Invalid(errors)) => Some(
                errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join(". "),
            ),
            FormStatus::Error(_) => Some(SUBMIT_FAILED_MESSAGE.to_string()),
        }
    }

    fn reset_status(&mut self) {
        self.status = FormStatus::Idle;
        self.status_since = None;
    }
}
