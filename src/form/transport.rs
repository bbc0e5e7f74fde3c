//! Network step of a submission.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::form::FormData;

/// Payload posted to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    /// Site owner the message is addressed to.
    pub to_name: String,
    /// Always the submitter's email.
    pub reply_to: String,
}

impl Submission {
    /// Build the payload for `data`, addressed to `owner`.
    pub fn new(data: &FormData, owner: &str) -> Self {
        Self {
            name: data.name.clone(),
            email: data.email.clone(),
            subject: data.subject.clone(),
            message: data.message.clone(),
            to_name: owner.to_owned(),
            reply_to: data.email.clone(),
        }
    }
}

/// Why a submission did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("relay answered {status}: {message}")]
    Rejected {
        status: u16,
        message: String,
        details: Option<String>,
    },
    #[error("relay is unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Carries one [`Submission`] to the relay.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Send `submission`, resolving once the relay has answered.
    async fn send(&self, submission: &Submission) -> Result<(), SubmitError>;
}

#[derive(Debug, Deserialize)]
struct RelayError {
    error: String,
    details: Option<String>,
}

/// JSON over HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a new [`HttpTransport`] posting to `endpoint`.
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Use a preconfigured client, e.g. one with a timeout.
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl SubmissionTransport for HttpTransport {
    async fn send(&self, submission: &Submission) -> Result<(), SubmitError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        let (message, details) = match serde_json::from_str::<RelayError>(&body) {
            Ok(err) => (err.error, err.details),
            Err(_) => (body, None),
        };

        Err(SubmitError::Rejected {
            status: status.as_u16(),
            message,
            details,
        })
    }
}
