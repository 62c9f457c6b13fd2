//! Submission, reset and status behavior of form sessions.

use formwork_forms::{
	ErrorKind, FieldRule, FormError, FormOptions, FormSession, FormValue, ResetOptions,
	SetValueOptions, SubmitOutcome, ValidationMode,
};
use regex::Regex;
use rstest::rstest;
use serde_json::json;
use std::cell::RefCell;

fn basic_form(options: FormOptions) -> FormSession {
	let session = FormSession::new(options.with_default_values(json!({
		"username": "",
		"email": "",
		"channel": "",
	})));
	session
		.register(
			"username",
			FieldRule::new()
				.required("Username is required")
				.min_length(3, "Username must be at least 3 characters"),
		)
		.unwrap();
	session
		.register(
			"email",
			FieldRule::new()
				.required("Email is required")
				.pattern(
					Regex::new(r"\S+@\S+\.\S+").unwrap(),
					"Please enter a valid email address",
				)
				.validate("notAdmin", |value: &FormValue| {
					if value.as_str() == Some("admin@example.com") {
						Err("Nice try!".to_string())
					} else {
						Ok(())
					}
				}),
		)
		.unwrap();
	session
		.register("channel", FieldRule::new().required("Channel is required"))
		.unwrap();
	session
}

async fn fill(session: &FormSession, username: &str, email: &str, channel: &str) {
	let options = SetValueOptions::default().dirty();
	session.set_value("username", username, options).await.unwrap();
	session.set_value("email", email, options).await.unwrap();
	session.set_value("channel", channel, options).await.unwrap();
}

#[tokio::test]
async fn test_empty_submission_reports_required_errors() {
	// Arrange
	let session = basic_form(FormOptions::new());
	let invalid = RefCell::new(None);

	// Act
	let outcome = session
		.handle_submit(
			|_| panic!("an empty form must not submit"),
			|errors| *invalid.borrow_mut() = Some(errors.clone()),
		)
		.await
		.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Invalid);
	let errors = invalid.into_inner().unwrap();
	assert_eq!(errors.len(), 3);
	assert_eq!(errors["username"].message, "Username is required");
	assert_eq!(errors["email"].kind, ErrorKind::Required);
	let status = session.status();
	assert!(status.is_submitted);
	assert!(!status.is_submit_successful);
	assert_eq!(status.submit_count, 1);
}

#[rstest]
#[case("ab", "jane@example.com", "username", "Username must be at least 3 characters")]
#[case("jane", "not-an-email", "email", "Please enter a valid email address")]
#[case("jane", "admin@example.com", "email", "Nice try!")]
#[tokio::test]
async fn test_first_failing_constraint_is_reported(
	#[case] username: &str,
	#[case] email: &str,
	#[case] field: &str,
	#[case] message: &str,
) {
	// Arrange
	let session = basic_form(FormOptions::new());
	fill(&session, username, email, "rust").await;

	// Act
	let outcome = session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Invalid);
	let errors = session.errors();
	assert_eq!(errors.len(), 1);
	assert_eq!(errors[field].message, message);
}

#[tokio::test]
async fn test_valid_submission_hands_over_values() {
	// Arrange
	let session = basic_form(FormOptions::new());
	fill(&session, "jane", "jane@example.com", "rust").await;
	let submitted = RefCell::new(None);

	// Act
	let outcome = session
		.handle_submit(
			|values| *submitted.borrow_mut() = Some(values.to_json()),
			|errors| panic!("unexpected errors: {:?}", errors),
		)
		.await
		.unwrap();

	// Assert
	assert!(outcome.is_valid());
	assert_eq!(
		submitted.into_inner(),
		Some(json!({"username": "jane", "email": "jane@example.com", "channel": "rust"}))
	);
	let status = session.status();
	assert!(status.is_submit_successful);
	assert!(!status.is_submitting);
	assert!(status.is_dirty);
}

#[tokio::test]
async fn test_revalidate_mode_applies_after_first_submission() {
	// Arrange
	let session = basic_form(FormOptions::new().with_mode(ValidationMode::OnSubmit));
	let username = session
		.register(
			"username",
			FieldRule::new()
				.required("Username is required")
				.min_length(3, "Username must be at least 3 characters"),
		)
		.unwrap();

	// Act
	username.on_change("ab").await.unwrap();
	let before_submit = username.error();
	session.handle_submit(|_| {}, |_| {}).await.unwrap();
	username.on_change("abc").await.unwrap();

	// Assert
	assert!(before_submit.is_none());
	assert!(username.error().is_none());
	assert!(!session.errors().contains_key("username"));
}

#[tokio::test]
async fn test_disabled_fields_are_left_out_of_submission() {
	// Arrange
	let session = FormSession::with_defaults(json!({
		"username": "jane",
		"social": {"twitter": "", "facebook": "jane.fb"},
	}));
	session
		.register(
			"social.twitter",
			FieldRule::new().required("Twitter handle is required").disabled(true),
		)
		.unwrap();
	let submitted = RefCell::new(None);

	// Act
	let outcome = session
		.handle_submit(|values| *submitted.borrow_mut() = Some(values.to_json()), |_| {})
		.await
		.unwrap();

	// Assert
	assert_eq!(outcome, SubmitOutcome::Valid);
	assert_eq!(
		submitted.into_inner(),
		Some(json!({"username": "jane", "social": {"facebook": "jane.fb"}}))
	);
	assert_eq!(session.get_value("social.twitter"), Some(FormValue::from("")));
}

#[tokio::test]
async fn test_reset_clears_submit_count_unless_kept() {
	// Arrange
	let session = basic_form(FormOptions::new());
	session.handle_submit(|_| {}, |_| {}).await.unwrap();
	session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Act
	session.reset_with(
		None,
		ResetOptions {
			keep_submit_count: true,
			..ResetOptions::default()
		},
	);
	let kept = session.status();
	session.reset();
	let cleared = session.status();

	// Assert
	assert_eq!(kept.submit_count, 2);
	assert!(!kept.is_submitted);
	assert!(kept.is_valid);
	assert_eq!(cleared.submit_count, 0);
}

#[tokio::test]
async fn test_reset_with_values_installs_new_defaults() {
	// Arrange
	let session = basic_form(FormOptions::new());
	fill(&session, "jane", "jane@example.com", "rust").await;

	// Act
	session.reset_with(
		Some(FormValue::from(json!({"username": "bob", "email": "", "channel": ""}))),
		ResetOptions::default(),
	);

	// Assert
	assert_eq!(session.get_value("username"), Some(FormValue::from("bob")));
	assert!(!session.status().is_dirty);
	assert!(session.dirty_fields().is_empty());
	assert_eq!(
		session.options().default_values.get("username"),
		Some(&FormValue::from("bob"))
	);
}

#[tokio::test]
async fn test_reset_on_submit_success_keeps_submit_count() {
	// Arrange
	let session = basic_form(FormOptions::new().with_reset_on_submit_success(true));
	fill(&session, "jane", "jane@example.com", "rust").await;

	// Act
	let outcome = session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Assert
	assert!(outcome.is_valid());
	let status = session.status();
	assert_eq!(status.submit_count, 1);
	assert!(!status.is_dirty);
	assert_eq!(session.get_value("username"), Some(FormValue::from("")));
}

#[tokio::test]
async fn test_errors_can_be_kept_across_reset() {
	// Arrange
	let session = basic_form(FormOptions::new());
	session.handle_submit(|_| {}, |_| {}).await.unwrap();

	// Act
	session.reset_with(
		None,
		ResetOptions {
			keep_errors: true,
			..ResetOptions::default()
		},
	);

	// Assert
	assert_eq!(session.errors().len(), 3);
	assert!(!session.status().is_valid);
}

#[tokio::test]
async fn test_set_value_rejects_paths_through_scalars() {
	// Arrange
	let session = basic_form(FormOptions::new());

	// Act
	let result = session
		.set_value("username.first", "jane", SetValueOptions::default())
		.await;

	// Assert
	assert!(matches!(result, Err(FormError::PathConflict { .. })));
	assert_eq!(session.get_value("username"), Some(FormValue::from("")));
}

#[tokio::test]
async fn test_options_load_from_toml() {
	// Arrange
	let source = r#"
mode = "onBlur"
revalidate_mode = "onSubmit"
reset_on_submit_success = true

[default_values]
username = "jane"
age = 30
"#;

	// Act
	let options = FormOptions::from_toml_str(source).unwrap();
	let session = FormSession::new(options);

	// Assert
	assert_eq!(session.options().mode, ValidationMode::OnBlur);
	assert_eq!(session.options().revalidate_mode, ValidationMode::OnSubmit);
	assert_eq!(session.get_value("age").and_then(|v| v.as_f64()), Some(30.0));
}
