use crate::config::{DEFAULT_OWNER, RelayConfiguration};
use crate::form::{FormData, Submission, SubmissionTransport, SubmitError, SubmitStatus};
use crate::validation::{self, Field, FieldErrors};

/// How a call to [`ContactForm::submit`] ended.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The relay accepted the message.
    Sent,
    /// Another submission is still outstanding; nothing changed.
    InFlight,
    /// At least one field broke its rule. No request was made.
    Invalid,
    /// Provider identifiers are missing. No request was made.
    Misconfigured,
    /// The request failed or the relay reported an error.
    Failed(SubmitError),
}

/// State and event handlers of the contact form.
pub struct ContactForm<T> {
    config: RelayConfiguration,
    transport: T,
    owner: String,
    data: FormData,
    errors: FieldErrors,
    status: SubmitStatus,
    is_submitting: bool,
}

impl<T: SubmissionTransport> ContactForm<T> {
    /// Create an empty form sending through `transport`.
    pub fn new(config: RelayConfiguration, transport: T) -> Self {
        Self {
            config,
            transport,
            owner: DEFAULT_OWNER.to_owned(),
            data: FormData::default(),
            errors: FieldErrors::new(),
            status: SubmitStatus::Idle,
            is_submitting: false,
        }
    }

    /// Address messages to `owner` instead of the default label.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn data(&self) -> &FormData {
        &self.data
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Whether the submit trigger should be enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting
    }

    /// Banner for the latest attempt.
    pub fn status_message(&self) -> Option<&'static str> {
        self.status.message()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Store an edit. Email is re-validated on every keystroke, other
    /// fields only lose their stale error.
    pub fn on_field_change(&mut self, field: Field, value: impl Into<String>) {
        self.data.set(field, value.into());
        self.errors.remove(field);

        if field == Field::Email {
            let error = validation::validate(field, self.data.get(field));
            self.errors.set(field, error);
        }
    }

    /// Validate `value` as the field loses focus.
    pub fn on_field_blur(&mut self, field: Field, value: &str) {
        self.errors.set(field, validation::validate(field, value));
    }

    /// [`Self::on_field_change`] keyed by input name. Unknown names are
    /// ignored.
    pub fn on_input(&mut self, name: &str, value: impl Into<String>) {
        match name.parse() {
            Ok(field) => self.on_field_change(field, value),
            Err(err) => tracing::debug!(%err, "input ignored"),
        }
    }

    /// [`Self::on_field_blur`] keyed by input name. Unknown names are
    /// ignored.
    pub fn on_blur(&mut self, name: &str, value: &str) {
        match name.parse() {
            Ok(field) => self.on_field_blur(field, value),
            Err(err) => tracing::debug!(%err, "blur ignored"),
        }
    }

    /// Validate and lock the form, returning the payload to send.
    ///
    /// On success the form is submitting until [`Self::finish_submit`] is
    /// called.
    pub fn begin_submit(&mut self) -> Result<Submission, SubmitOutcome> {
        if self.is_submitting {
            return Err(SubmitOutcome::InFlight);
        }

        let errors = validation::validate_form(&self.data);
        if !errors.is_empty() {
            tracing::debug!(fields = errors.len(), "form has invalid fields");
            self.errors = errors;
            self.status = SubmitStatus::Error;
            return Err(SubmitOutcome::Invalid);
        }

        if !self.config.is_complete() {
            tracing::error!(
                "email provider configuration missing, check environment variables"
            );
            self.status = SubmitStatus::Error;
            return Err(SubmitOutcome::Misconfigured);
        }

        self.is_submitting = true;
        self.status = SubmitStatus::Idle;
        self.errors.clear();

        Ok(Submission::new(&self.data, &self.owner))
    }

    /// Record the result of the request started by [`Self::begin_submit`].
    pub fn finish_submit(
        &mut self,
        result: Result<(), SubmitError>,
    ) -> SubmitOutcome {
        let outcome = match result {
            Ok(()) => {
                tracing::info!("message sent");
                self.status = SubmitStatus::Success;
                self.data = FormData::default();
                SubmitOutcome::Sent
            },
            Err(err) => {
                tracing::error!(error = %err, "failed to send message");
                self.status = SubmitStatus::Error;
                SubmitOutcome::Failed(err)
            },
        };

        self.is_submitting = false;
        outcome
    }

    /// Validate the form and, when valid, send it to the relay.
    pub async fn submit(&mut self) -> SubmitOutcome {
        let submission = match self.begin_submit() {
            Ok(submission) => submission,
            Err(outcome) => return outcome,
        };

        let result = self.transport.send(&submission).await;
        self.finish_submit(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        fail: bool,
        sent: Mutex<Vec<Submission>>,
    }

    impl FakeTransport {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SubmissionTransport for FakeTransport {
        async fn send(&self, submission: &Submission) -> Result<(), SubmitError> {
            self.sent.lock().unwrap().push(submission.clone());
            if self.fail {
                Err(SubmitError::Rejected {
                    status: 500,
                    message: "Failed to send email".into(),
                    details: None,
                })
            } else {
                Ok(())
            }
        }
    }

    fn configured() -> RelayConfiguration {
        RelayConfiguration::new(
            Some("service_123".into()),
            Some("template_456".into()),
            Some("public_789".into()),
        )
    }

    fn filled(transport: FakeTransport) -> ContactForm<FakeTransport> {
        let mut form = ContactForm::new(configured(), transport);
        form.on_field_change(Field::Name, "Jane");
        form.on_field_change(Field::Email, "jane@x.com");
        form.on_field_change(Field::Subject, "Hello there");
        form.on_field_change(Field::Message, "This is a message.");
        form
    }

    #[test]
    fn test_email_validates_on_change() {
        let mut form = ContactForm::new(configured(), FakeTransport::default());

        form.on_field_change(Field::Email, "john@");
        assert_eq!(
            form.errors().get(Field::Email),
            Some("Please enter a valid email address")
        );

        form.on_field_change(Field::Email, "john@example.com");
        assert_eq!(form.errors().get(Field::Email), None);
        assert_eq!(form.data().email, "john@example.com");
    }

    #[test]
    fn test_other_fields_validate_on_blur() {
        let mut form = ContactForm::new(configured(), FakeTransport::default());

        form.on_field_change(Field::Name, "A");
        assert_eq!(form.errors().get(Field::Name), None);

        form.on_field_blur(Field::Name, "A");
        assert_eq!(
            form.errors().get(Field::Name),
            Some("Name must be at least 2 characters")
        );

        // Editing clears the stale error without re-validating.
        form.on_field_change(Field::Name, "B");
        assert_eq!(form.errors().get(Field::Name), None);

        form.on_field_blur(Field::Name, "Bo");
        assert_eq!(form.errors().get(Field::Name), None);
    }

    #[test]
    fn test_unknown_inputs_are_ignored() {
        let mut form = ContactForm::new(configured(), FakeTransport::default());
        form.on_input("phone", "12345");
        form.on_blur("phone", "");
        assert!(form.data().is_empty());
        assert!(form.errors().is_empty());

        form.on_input("subject", "Hello there");
        assert_eq!(form.data().subject, "Hello there");
    }

    #[test]
    fn test_submitting_flag_brackets_request() {
        let mut form = filled(FakeTransport::default());
        assert!(!form.is_submitting());

        let submission = form.begin_submit().unwrap();
        assert!(form.is_submitting());
        assert!(!form.can_submit());
        assert_eq!(form.status(), SubmitStatus::Idle);
        assert_eq!(submission.to_name, DEFAULT_OWNER);
        assert_eq!(submission.reply_to, "jane@x.com");

        // A second trigger while in flight is refused untouched.
        assert!(matches!(form.begin_submit(), Err(SubmitOutcome::InFlight)));
        assert!(form.is_submitting());

        let outcome = form.finish_submit(Ok(()));
        assert!(matches!(outcome, SubmitOutcome::Sent));
        assert!(!form.is_submitting());
    }

    #[tokio::test]
    async fn test_submit_success_resets_form() {
        let mut form = filled(FakeTransport::default()).owner("Site Owner");

        let outcome = form.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Sent));
        assert_eq!(form.status(), SubmitStatus::Success);
        assert!(!form.is_submitting());
        assert!(form.data().is_empty());
        assert!(form.errors().is_empty());
        assert_eq!(form.transport().calls(), 1);
        assert_eq!(
            form.transport().sent.lock().unwrap()[0].to_name,
            "Site Owner"
        );
        assert!(form.status_message().is_some());
    }

    #[tokio::test]
    async fn test_submit_invalid_makes_no_request() {
        let mut form = filled(FakeTransport::default());
        form.on_field_change(Field::Subject, "Hey");
        let before = form.data().clone();

        let outcome = form.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Invalid));
        assert_eq!(form.status(), SubmitStatus::Error);
        assert_eq!(form.data(), &before);
        assert!(form.errors().contains(Field::Subject));
        assert_eq!(form.errors().len(), 1);
        assert!(!form.is_submitting());
        assert_eq!(form.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_without_configuration() {
        let transport = FakeTransport::default();
        let mut form = ContactForm::new(RelayConfiguration::default(), transport);
        form.on_field_change(Field::Name, "Jane");
        form.on_field_change(Field::Email, "jane@x.com");
        form.on_field_change(Field::Subject, "Hello there");
        form.on_field_change(Field::Message, "This is a message.");

        let outcome = form.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Misconfigured));
        assert_eq!(form.status(), SubmitStatus::Error);
        assert!(form.errors().is_empty());
        assert_eq!(form.data().name, "Jane");
        assert_eq!(form.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_data() {
        let mut form = filled(FakeTransport::failing());
        let before = form.data().clone();

        let outcome = form.submit().await;

        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(form.status(), SubmitStatus::Error);
        assert_eq!(form.data(), &before);
        assert!(!form.is_submitting());
        assert_eq!(form.transport().calls(), 1);
    }

    #[tokio::test]
    async fn test_next_attempt_overwrites_status() {
        let mut form = filled(FakeTransport::default());
        form.on_field_change(Field::Message, "short");
        assert!(matches!(form.submit().await, SubmitOutcome::Invalid));
        assert_eq!(form.status(), SubmitStatus::Error);

        form.on_field_change(Field::Message, "This is a message.");
        assert!(matches!(form.submit().await, SubmitOutcome::Sent));
        assert_eq!(form.status(), SubmitStatus::Success);
    }
}
