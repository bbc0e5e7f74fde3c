//! Error handler for the relay.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::mail::ProviderError;
use crate::telemetry;

pub type Result<T> = std::result::Result<T, ServerError>;

pub const MISSING_FIELDS: &str =
    "Missing required fields: name, email, subject, message";
pub const INVALID_EMAIL: &str = "Invalid email format";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("email provider configuration missing")]
    Configuration,

    #[error("failed to send email")]
    Delivery {
        source: ProviderError,
        /// Whether the response may carry `source` as details.
        expose: bool,
    },
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    #[serde(skip)]
    status: u16,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `error` field.
    pub fn error(mut self, error: &str) -> Self {
        self.error = error.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.details = Some(description.into());
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            error: "Internal server error".to_owned(),
            details: None,
        }
    }
}

/// Pick the message for a rejected payload. Missing fields win over a
/// malformed email.
fn validation_message(errors: &ValidationErrors) -> &'static str {
    let missing = errors
        .field_errors()
        .values()
        .flat_map(|issues| issues.iter())
        .any(|issue| issue.code == "required");

    if missing { MISSING_FIELDS } else { INVALID_EMAIL }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default().status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(errors) => {
                telemetry::record_submission("invalid");
                response.error(validation_message(errors))
            },

            ServerError::Axum(rejection) => {
                tracing::debug!(%rejection, "request body rejected");
                telemetry::record_submission("invalid");

                // Every body rejection is a 400; a field of the wrong type
                // counts as missing.
                match rejection {
                    JsonRejection::JsonDataError(_) => response.error(MISSING_FIELDS),
                    _ => response.error("Invalid request body"),
                }
            },

            ServerError::MethodNotAllowed => {
                let response = response
                    .status(StatusCode::METHOD_NOT_ALLOWED)
                    .error("Method not allowed");

                return match response.into_response() {
                    Ok(mut response) => {
                        response.headers_mut().insert(
                            header::ALLOW,
                            header::HeaderValue::from_static("POST"),
                        );
                        response
                    },
                    Err(_) => internal_server_error(),
                };
            },

            ServerError::Configuration => {
                ResponseError::default().error("Server configuration error")
            },

            ServerError::Delivery { source, expose } => {
                tracing::error!(error = %source, "error sending email");

                let response =
                    ResponseError::default().error("Failed to send email");
                if *expose {
                    response.details(&source.to_string())
                } else {
                    response
                }
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "error": "Internal server error",
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
