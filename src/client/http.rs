use std::time::Duration;

use derive_more::Display;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::{
    entities::contact::{ContactAcceptedResponse, ContactRequest},
    errors::FieldError,
};

/// Why a submission did not go through, as seen from the client side.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SubmitFailure {
    #[display("{message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[display("Invalid submission")]
    Invalid(Vec<FieldError>),

    #[display("{_0}")]
    Rejected(String),

    #[display("{_0}")]
    Server(String),

    #[display("Network error: {_0}")]
    Network(String),
}

/// A `ContactClient` could not be constructed.
#[derive(Debug, Display)]
pub enum ClientBuildError {
    #[display("Invalid API base URL: {_0}")]
    InvalidUrl(url::ParseError),

    #[display("Failed to build HTTP client: {_0}")]
    Http(reqwest::Error),
}

impl std::error::Error for ClientBuildError {}

impl From<url::ParseError> for ClientBuildError {
    fn from(err: url::ParseError) -> Self {
        ClientBuildError::InvalidUrl(err)
    }
}

impl From<reqwest::Error> for ClientBuildError {
    fn from(err: reqwest::Error) -> Self {
        ClientBuildError::Http(err)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

/// Talks to `POST /api/contact` on a running API.
#[derive(Debug, Clone)]
pub struct ContactClient {
    http: Client,
    endpoint: Url,
}

impl ContactClient {
    /// `base_url` is the API origin, e.g. `https://api.example.com`.
    pub fn new(base_url: &str) -> Result<Self, ClientBuildError> {
        Self::with_timeout(base_url, Duration::from_secs(15))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientBuildError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("api/contact")?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(ContactClient { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn send(&self, request: &ContactRequest) -> Result<ContactAcceptedResponse, SubmitFailure> {
        let response = self.http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitFailure::Network(e.to_string()))?;

        let status = response.status();

        if status.is_success() {
            return response
                .json::<ContactAcceptedResponse>()
                .await
                .map_err(|e| SubmitFailure::Server(format!("Unexpected response: {}", e)));
        }

        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .json::<ErrorBody>()
            .await
            .unwrap_or(ErrorBody { message: None, errors: None });

        let message = body
            .message
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => SubmitFailure::RateLimited { message, retry_after_secs },
            s if s.is_client_error() => match body.errors {
                Some(errors) if !errors.is_empty() => SubmitFailure::Invalid(errors),
                _ => SubmitFailure::Rejected(message),
            },
            _ => SubmitFailure::Server(message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_joined_onto_base() {
        let client = ContactClient::new("http://localhost:5000").unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:5000/api/contact");

        let client = ContactClient::new("https://example.com/portfolio").unwrap();
        assert_eq!(client.endpoint().as_str(), "https://example.com/portfolio/api/contact");
    }

    #[test]
    fn rejects_invalid_base() {
        assert!(matches!(
            ContactClient::new("not a url"),
            Err(ClientBuildError::InvalidUrl(_))
        ));
    }

    #[test]
    fn custom_timeout_builds() {
        let client = ContactClient::with_timeout("http://localhost:5000", Duration::from_millis(250));
        assert!(client.is_ok());
    }
}
