//! Forward contact messages to the email delivery provider.

use std::borrow::Cow;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::config::Credentials;

/// Variables rendered by the provider's email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams<'a> {
    pub to_name: Cow<'a, str>,
    pub from_name: Cow<'a, str>,
    pub from_email: Cow<'a, str>,
    pub subject: Cow<'a, str>,
    pub message: Cow<'a, str>,
    pub reply_to: Cow<'a, str>,
}

impl<'a> TemplateParams<'a> {
    /// Create template variables for a message sent by `from_email`.
    pub fn new(
        to_name: &'a str,
        from_name: &'a str,
        from_email: &'a str,
        subject: &'a str,
        message: &'a str,
    ) -> Self {
        Self {
            to_name: Cow::from(to_name),
            from_name: Cow::from(from_name),
            from_email: Cow::from(from_email),
            subject: Cow::from(subject),
            message: Cow::from(message),
            reply_to: Cow::from(from_email),
        }
    }
}

/// Accepted send request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub status: u16,
    /// Result text returned by the provider.
    pub text: String,
}

/// Faults raised while talking to the provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider rejected the message ({status}): {text}")]
    Rejected { status: u16, text: String },
    #[error("provider is unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Port for sending contact messages.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send one message rendered from `params`.
    async fn send(
        &self,
        credentials: Credentials<'_>,
        params: &TemplateParams<'_>,
    ) -> Result<Delivery, ProviderError>;
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    template_params: &'a TemplateParams<'a>,
}

/// EmailJS REST client.
#[derive(Debug, Clone)]
pub struct EmailJs {
    client: reqwest::Client,
    url: Url,
}

impl EmailJs {
    /// Create a new [`EmailJs`] client posting to `url`.
    pub fn new(url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl EmailProvider for EmailJs {
    async fn send(
        &self,
        credentials: Credentials<'_>,
        params: &TemplateParams<'_>,
    ) -> Result<Delivery, ProviderError> {
        let request = SendRequest {
            service_id: credentials.service_id,
            template_id: credentials.template_id,
            user_id: credentials.public_key,
            template_params: params,
        };

        tracing::trace!(url = %self.url, "sending message to provider");

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            Ok(Delivery {
                status: status.as_u16(),
                text,
            })
        } else {
            Err(ProviderError::Rejected {
                status: status.as_u16(),
                text: if text.is_empty() {
                    status.canonical_reason().unwrap_or("no reason").to_owned()
                } else {
                    text
                },
            })
        }
    }
}
