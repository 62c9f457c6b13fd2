//! Asynchronous validators driven by a form session.

use async_trait::async_trait;
use formwork_forms::{
	ErrorKind, FieldBinding, FieldRule, FormError, FormOptions, FormSession, FormValue,
	REJECTED_VALIDATOR_MESSAGE, SubmitOutcome, ValidationMode,
};
use formwork_validators::{
	AsyncValidator, LookupClient, LookupError, RemoteLookupValidator, ValidationResult, Verdict,
};
use futures::FutureExt as _;
use rstest::rstest;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

const USERS: &str = "https://directory.test/users";

/// Directory that knows a single taken address, or fails every request.
struct StubDirectory {
	offline: bool,
	requests: Mutex<Vec<String>>,
}

impl StubDirectory {
	fn online() -> Self {
		Self {
			offline: false,
			requests: Mutex::new(Vec::new()),
		}
	}

	fn offline() -> Self {
		Self {
			offline: true,
			requests: Mutex::new(Vec::new()),
		}
	}
}

#[async_trait]
impl LookupClient for StubDirectory {
	async fn fetch_records(&self, url: &str) -> Result<Vec<Value>, LookupError> {
		self.requests.lock().unwrap().push(url.to_string());
		if self.offline {
			return Err(LookupError::Transport {
				url: url.to_string(),
				message: "connection refused".to_string(),
			});
		}
		if url.ends_with("/taken@example.com") {
			Ok(vec![json!({"id": 1, "email": "taken@example.com"})])
		} else {
			Ok(Vec::new())
		}
	}
}

fn email_form(directory: Arc<StubDirectory>) -> FormSession {
	let session = FormSession::with_defaults(json!({"email": ""}));
	let lookup = RemoteLookupValidator::new(USERS, directory).with_message("This email is already taken");
	session
		.register(
			"email",
			FieldRule::new()
				.required("Email is required")
				.validate_async("emailAvailable", lookup),
		)
		.unwrap();
	session
}

#[rstest]
#[case("taken@example.com", Some("This email is already taken"))]
#[case("free@example.com", None)]
#[tokio::test]
async fn test_remote_lookup_decides_availability(
	#[case] email: &str,
	#[case] expected: Option<&str>,
) {
	// Arrange
	let directory = Arc::new(StubDirectory::online());
	let session = email_form(directory.clone());

	// Act
	session
		.set_value("email", email, Default::default())
		.await
		.unwrap();
	let valid = session.trigger("email").await.unwrap();

	// Assert
	assert_eq!(valid, expected.is_none());
	assert_eq!(
		session.error("email").map(|e| e.message),
		expected.map(str::to_string)
	);
	assert_eq!(
		*directory.requests.lock().unwrap(),
		vec![format!("{}/{}", USERS, email)]
	);
}

#[tokio::test]
async fn test_async_validator_skipped_when_sync_constraints_fail() {
	// Arrange
	let directory = Arc::new(StubDirectory::online());
	let session = email_form(directory.clone());

	// Act
	let outcome = session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Invalid);
	assert_eq!(session.error("email").map(|e| e.kind), Some(ErrorKind::Required));
	assert!(directory.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_validator_fails_field_and_logs_warning() {
	use tracing_subscriber::layer::SubscriberExt as _;
	use tracing_subscriber::util::SubscriberInitExt as _;

	// Arrange
	struct LogCapture {
		logs: Arc<Mutex<Vec<String>>>,
	}

	impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
		fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
			struct MessageVisitor {
				message: String,
			}

			impl tracing::field::Visit for MessageVisitor {
				fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
					if field.name() == "message" {
						self.message = format!("{:?}", value);
					}
				}
			}

			let mut visitor = MessageVisitor {
				message: String::new(),
			};
			event.record(&mut visitor);
			self.logs
				.lock()
				.unwrap()
				.push(format!("[{}] {}", event.metadata().level(), visitor.message));
		}
	}

	let logs = Arc::new(Mutex::new(Vec::new()));
	let _guard = tracing_subscriber::registry()
		.with(LogCapture { logs: logs.clone() })
		.set_default();
	let session = email_form(Arc::new(StubDirectory::offline()));
	session
		.set_value("email", "jane@example.com", Default::default())
		.await
		.unwrap();

	// Act
	let outcome = session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Invalid);
	let error = session.error("email").unwrap();
	assert_eq!(error.kind, ErrorKind::Validate("emailAvailable".to_string()));
	assert_eq!(error.message, REJECTED_VALIDATOR_MESSAGE);
	let captured = logs.lock().unwrap();
	assert!(
		captured
			.iter()
			.any(|log| log.contains("WARN") && log.contains("async validator rejected")),
		"expected a warning, got: {:?}",
		*captured
	);
}

#[tokio::test]
async fn test_each_field_keeps_its_own_failure() {
	// Arrange
	let session = FormSession::with_defaults(json!({"username": "", "email": "", "channel": ""}));
	let lookup = RemoteLookupValidator::new(USERS, Arc::new(StubDirectory::offline()));
	session
		.register("username", FieldRule::new().required("Username is required"))
		.unwrap();
	session
		.register(
			"email",
			FieldRule::new()
				.required("Email is required")
				.validate_async("emailAvailable", lookup),
		)
		.unwrap();
	session
		.register("channel", FieldRule::new().required("Channel is required"))
		.unwrap();
	session
		.set_value("email", "jane@example.com", Default::default())
		.await
		.unwrap();
	session
		.set_value("channel", "rustaceans", Default::default())
		.await
		.unwrap();
	let reported = RefCell::new(Vec::<String>::new());

	// Act
	let outcome = session
		.handle_submit(
			|_| {},
			|errors| {
				*reported.borrow_mut() = errors.keys().cloned().collect();
			},
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Invalid);
	assert_eq!(
		session.error("username").map(|e| e.kind),
		Some(ErrorKind::Required)
	);
	assert_eq!(
		session.error("email").map(|e| e.message),
		Some(REJECTED_VALIDATOR_MESSAGE.to_string())
	);
	assert!(session.error("channel").is_none());
	assert_eq!(reported.into_inner().len(), 2);
	assert!(!session.status().is_validating);
}

/// Holds back its verdict for `"slow"` until released.
struct Gated {
	release: Arc<Notify>,
}

#[async_trait]
impl AsyncValidator for Gated {
	async fn validate(&self, value: Value) -> ValidationResult<Verdict> {
		if value == json!("slow") {
			self.release.notified().await;
			return Ok(Err("slow value rejected".to_string()));
		}
		Ok(Ok(()))
	}
}

fn gated_form(mode: ValidationMode, release: Arc<Notify>) -> (FormSession, FieldBinding) {
	let session = FormSession::new(
		FormOptions::new()
			.with_mode(mode)
			.with_default_values(json!({"username": ""})),
	);
	let username = session
		.register(
			"username",
			FieldRule::new().validate_async("gated", Gated { release }),
		)
		.unwrap();
	(session, username)
}

#[tokio::test]
async fn test_stale_async_result_is_discarded() {
	// Arrange
	let release = Arc::new(Notify::new());
	let (session, username) = gated_form(ValidationMode::OnChange, release.clone());

	// Act
	let slow = username.on_change("slow");
	let fast = async {
		username.on_change("fast").await.unwrap();
		let validating = session.status().is_validating;
		release.notify_one();
		validating
	};
	let (slow, validating_meanwhile) = tokio::join!(slow, fast);
	slow.unwrap();

	// Assert
	assert!(validating_meanwhile);
	assert_eq!(username.value(), Some(FormValue::from("fast")));
	assert!(username.error().is_none());
	assert!(!session.status().is_validating);
}

#[tokio::test]
async fn test_concurrent_submission_is_rejected() {
	// Arrange
	let release = Arc::new(Notify::new());
	let (session, _username) = gated_form(ValidationMode::OnSubmit, release.clone());
	session
		.set_value("username", "slow", Default::default())
		.await
		.unwrap();

	// Act
	let first = session.handle_submit(|_| {}, |_| {});
	let second = async {
		let result = session.handle_submit(|_| {}, |_| {}).await;
		let submitting = session.status().is_submitting;
		release.notify_one();
		(result, submitting)
	};
	let (first, (second, submitting)) = tokio::join!(first, second);

	// Assert
	assert!(submitting);
	assert!(matches!(second, Err(FormError::SubmissionInProgress)));
	assert_eq!(first.unwrap(), SubmitOutcome::Invalid);
	assert_eq!(session.status().submit_count, 1);
	assert!(!session.status().is_submitting);
}

#[tokio::test]
async fn test_value_written_during_submission_is_validated_before_on_valid() {
	// Arrange
	let release = Arc::new(Notify::new());
	let session = FormSession::with_defaults(json!({"username": ""}));
	session
		.register(
			"username",
			FieldRule::new()
				.required("Username is required")
				.validate_async("gated", Gated { release: release.clone() }),
		)
		.unwrap();
	session
		.set_value("username", "slow", Default::default())
		.await
		.unwrap();
	let submitted = RefCell::new(None);

	// Act
	let submit = session.handle_submit(|values| *submitted.borrow_mut() = Some(values), |_| {});
	let edit = async {
		session
			.set_value("username", "", Default::default())
			.await
			.unwrap();
		release.notify_one();
	};
	let (outcome, ()) = tokio::join!(submit, edit);

	// Assert
	assert_eq!(outcome.unwrap(), SubmitOutcome::Invalid);
	assert!(submitted.into_inner().is_none());
	assert_eq!(
		session.error("username").map(|e| e.kind),
		Some(ErrorKind::Required)
	);
	assert_eq!(session.status().submit_count, 1);
}

#[tokio::test]
async fn test_dropped_submission_releases_the_session() {
	// Arrange
	let release = Arc::new(Notify::new());
	let (session, _username) = gated_form(ValidationMode::OnSubmit, release);
	session
		.set_value("username", "slow", Default::default())
		.await
		.unwrap();

	// Act
	let abandoned = session.handle_submit(|_| {}, |_| {}).now_or_never();
	let status = session.status();
	session
		.set_value("username", "fine", Default::default())
		.await
		.unwrap();
	let second = session.handle_submit(|_| {}, |_| {}).await;

	// Assert
	assert!(abandoned.is_none());
	assert!(!status.is_submitting);
	assert!(!status.is_validating);
	assert_eq!(status.submit_count, 0);
	assert_eq!(second.unwrap(), SubmitOutcome::Valid);
	assert_eq!(session.status().submit_count, 1);
}
