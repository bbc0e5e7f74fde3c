//! Relay a contact message to the email provider.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Result, ServerError};
use crate::mail::TemplateParams;
use crate::router::Valid;
use crate::{AppState, telemetry};

pub const SUCCESS_MESSAGE: &str = "Email sent successfully";

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(required, custom(function = "crate::validation::present"))]
    pub name: Option<String>,
    #[validate(
        required,
        custom(function = "crate::validation::email_format")
    )]
    pub email: Option<String>,
    #[validate(required, custom(function = "crate::validation::present"))]
    pub subject: Option<String>,
    #[validate(required, custom(function = "crate::validation::present"))]
    pub message: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    pub message: String,
}

/// Handler forwarding a validated message.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Response>> {
    let Some(credentials) = state.relay.credentials() else {
        tracing::error!("email provider configuration missing on server");
        telemetry::record_submission("misconfigured");
        return Err(ServerError::Configuration);
    };

    let name = body.name.unwrap_or_default();
    let email = body.email.unwrap_or_default();
    let subject = body.subject.unwrap_or_default();
    let message = body.message.unwrap_or_default();
    let params =
        TemplateParams::new(&state.config.owner, &name, &email, &subject, &message);

    match state.provider.send(credentials, &params).await {
        Ok(delivery) => {
            tracing::info!(
                status = delivery.status,
                result = delivery.text,
                "email sent successfully"
            );
            telemetry::record_submission("sent");

            Ok(Json(Response {
                success: true,
                message: SUCCESS_MESSAGE.to_owned(),
            }))
        },
        Err(source) => {
            telemetry::record_submission("failed");
            Err(ServerError::Delivery {
                source,
                expose: state.config.mode.is_development(),
            })
        },
    }
}
