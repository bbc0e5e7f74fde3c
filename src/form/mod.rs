//! Client side of the contact pipeline.
//!
//! [`ContactForm`] holds what the visitor typed, the inline errors and the
//! submission lifecycle. Presentation code reads its state and forwards
//! input events to it.

mod controller;
mod transport;

use serde::{Deserialize, Serialize};

pub use controller::{ContactForm, SubmitOutcome};
pub use transport::{HttpTransport, Submission, SubmissionTransport, SubmitError};

use crate::validation::Field;

/// Shown once a message has been relayed.
pub const SUCCESS_MESSAGE: &str = "Thank you! Your message has been sent successfully. I'll get back to you soon!";
/// Shown for every failed attempt, whatever the cause.
pub const ERROR_MESSAGE: &str = "Oops! Something went wrong. Please try again or contact me directly via email.";

/// Values currently held by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormData {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl FormData {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Subject => &self.subject,
            Field::Message => &self.message,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::Subject => &mut self.subject,
            Field::Message => &mut self.message,
        };
        *slot = value;
    }

    /// Whether every field is an empty string.
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_empty())
    }
}

/// Outcome of the latest submission attempt, as displayed to the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitStatus {
    #[default]
    Idle,
    Success,
    Error,
}

impl SubmitStatus {
    /// Banner text for this status. Nothing is displayed while idle.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            SubmitStatus::Idle => None,
            SubmitStatus::Success => Some(SUCCESS_MESSAGE),
            SubmitStatus::Error => Some(ERROR_MESSAGE),
        }
    }
}
