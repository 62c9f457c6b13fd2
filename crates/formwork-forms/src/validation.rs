//! The ordered rule pipeline and its results.

use crate::rule::{Constraint, FieldRule};
use crate::value::FormValue;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Message recorded when an asynchronous validator could not decide.
pub const REJECTED_VALIDATOR_MESSAGE: &str = "Validation could not be completed";

/// Which constraint produced a [`FieldError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
	Required,
	MinLength,
	MaxLength,
	Min,
	Max,
	Pattern,
	/// A named validator, synchronous or not.
	Validate(String),
	/// Set through [`FormSession::set_error`](crate::FormSession::set_error).
	Manual,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ErrorKind::Required => f.write_str("required"),
			ErrorKind::MinLength => f.write_str("minLength"),
			ErrorKind::MaxLength => f.write_str("maxLength"),
			ErrorKind::Min => f.write_str("min"),
			ErrorKind::Max => f.write_str("max"),
			ErrorKind::Pattern => f.write_str("pattern"),
			ErrorKind::Validate(name) => write!(f, "validate:{}", name),
			ErrorKind::Manual => f.write_str("manual"),
		}
	}
}

impl Serialize for ErrorKind {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

/// The single error a failing field carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
	pub kind: ErrorKind,
	pub message: String,
}

impl FieldError {
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
		}
	}

	/// A caller-provided error of kind [`ErrorKind::Manual`].
	pub fn manual(message: impl Into<String>) -> Self {
		Self::new(ErrorKind::Manual, message)
	}
}

impl fmt::Display for FieldError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

/// Errors of a session keyed by the field's current path.
pub type FieldErrors = BTreeMap<String, FieldError>;

impl FieldRule {
	/// Run the rule against `value` and return the first failure.
	///
	/// `Required` runs first, then the built-in checks, then synchronous named
	/// validators and finally asynchronous ones, each group in declared order.
	/// Asynchronous validators are only awaited once every synchronous
	/// constraint passed. Disabled rules always pass.
	///
	/// # Examples
	///
	/// ```
	/// use formwork_forms::{ErrorKind, FieldRule, FormValue};
	///
	/// let rule = FieldRule::new()
	///     .required("Username is required")
	///     .min_length(3, "Username must be at least 3 characters");
	///
	/// # tokio_test::block_on(async {
	/// let error = rule.evaluate(&FormValue::from("ab")).await.unwrap();
	/// assert_eq!(error.kind, ErrorKind::MinLength);
	/// assert_eq!(error.message, "Username must be at least 3 characters");
	///
	/// assert!(rule.evaluate(&FormValue::from("abcdef")).await.is_none());
	/// # });
	/// ```
	pub async fn evaluate(&self, value: &FormValue) -> Option<FieldError> {
		if self.is_disabled() {
			return None;
		}

		for constraint in self.pipeline() {
			let failure = match constraint {
				Constraint::ValidateAsync { name, validator } => {
					match validator.validate(value.to_json()).await {
						Ok(Ok(())) => None,
						Ok(Err(message)) => {
							Some(FieldError::new(ErrorKind::Validate(name.clone()), message))
						}
						Err(error) => {
							tracing::warn!(validator = %name, error = %error, "async validator rejected");
							Some(FieldError::new(
								ErrorKind::Validate(name.clone()),
								REJECTED_VALIDATOR_MESSAGE,
							))
						}
					}
				}
				other => check(other, value),
			};
			if failure.is_some() {
				return failure;
			}
		}
		None
	}
}

/// Evaluate one synchronous constraint.
fn check(constraint: &Constraint, value: &FormValue) -> Option<FieldError> {
	let fail = |kind: ErrorKind, message: &str| Some(FieldError::new(kind, message));

	// Built-in checks leave empty values to `Required`.
	let is_built_in = matches!(
		constraint,
		Constraint::MinLength { .. }
			| Constraint::MaxLength { .. }
			| Constraint::Min { .. }
			| Constraint::Max { .. }
			| Constraint::Pattern { .. }
	);
	if is_built_in && value.is_empty() {
		return None;
	}

	match constraint {
		Constraint::Required { message } => {
			let missing = value.is_empty() || value.as_bool() == Some(false);
			if missing {
				return fail(ErrorKind::Required, message);
			}
			None
		}
		Constraint::MinLength { min, message } => {
			match length(value) {
				Some(len) if len < *min => fail(ErrorKind::MinLength, message),
				_ => None,
			}
		}
		Constraint::MaxLength { max, message } => {
			match length(value) {
				Some(len) if len > *max => fail(ErrorKind::MaxLength, message),
				_ => None,
			}
		}
		Constraint::Min { min, message } => match numeric(value) {
			Some(n) if n < *min => fail(ErrorKind::Min, message),
			_ => None,
		},
		Constraint::Max { max, message } => match numeric(value) {
			Some(n) if n > *max => fail(ErrorKind::Max, message),
			_ => None,
		},
		Constraint::Pattern { regex, message } => match value.as_str() {
			Some(text) if !regex.is_match(text) => fail(ErrorKind::Pattern, message),
			_ => None,
		},
		Constraint::Validate { name, check: validator } => match validator(value) {
			Ok(()) => None,
			Err(message) => fail(ErrorKind::Validate(name.clone()), &message),
		},
		Constraint::ValidateAsync { .. } | Constraint::Disabled => None,
	}
}

fn length(value: &FormValue) -> Option<usize> {
	match value {
		FormValue::Text(text) => Some(text.chars().count()),
		FormValue::List(items) => Some(items.len()),
		_ => None,
	}
}

/// Numeric view used by `Min`/`Max`; text that parses as a number counts.
fn numeric(value: &FormValue) -> Option<f64> {
	match value {
		FormValue::Number(n) => Some(*n),
		FormValue::Text(text) => text.trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use formwork_validators::{AsyncValidator, ValidationResult, ValidatorError, Verdict};
	use regex::Regex;
	use rstest::rstest;
	use serde_json::Value;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	fn username_rule() -> FieldRule {
		FieldRule::new()
			.required("Username is required")
			.min_length(3, "Username must be at least 3 characters")
	}

	#[rstest]
	#[case("", Some((ErrorKind::Required, "Username is required")))]
	#[case("ab", Some((ErrorKind::MinLength, "Username must be at least 3 characters")))]
	#[case("abc", None)]
	#[case("ünï", None)]
	#[tokio::test]
	async fn test_username_rule(#[case] input: &str, #[case] expected: Option<(ErrorKind, &str)>) {
		// Act
		let error = username_rule().evaluate(&FormValue::from(input)).await;

		// Assert
		assert_eq!(
			error,
			expected.map(|(kind, message)| FieldError::new(kind, message))
		);
	}

	#[rstest]
	#[case("", Some(FieldError::new(ErrorKind::Required, "")))]
	#[case("filled", None)]
	#[tokio::test]
	async fn test_required_flag_reports_empty_message(
		#[case] input: &str,
		#[case] expected: Option<FieldError>,
	) {
		// Act
		let error = FieldRule::new().required_flag().evaluate(&FormValue::from(input)).await;

		// Assert
		assert_eq!(error, expected);
	}

	#[rstest]
	#[case(FormValue::Number(17.0), Some(ErrorKind::Min))]
	#[case(FormValue::Number(18.0), None)]
	#[case(FormValue::from("17"), Some(ErrorKind::Min))]
	#[case(FormValue::Number(121.0), Some(ErrorKind::Max))]
	#[case(FormValue::Null, Some(ErrorKind::Required))]
	#[tokio::test]
	async fn test_age_rule(#[case] value: FormValue, #[case] expected: Option<ErrorKind>) {
		// Arrange
		let rule = FieldRule::new()
			.value_as_number()
			.required("Age is required")
			.min(18.0, "You must be at least 18 years old")
			.max(120.0, "Too old");

		// Act
		let error = rule.evaluate(&value).await;

		// Assert
		assert_eq!(error.map(|e| e.kind), expected);
	}

	#[tokio::test]
	async fn test_built_ins_skip_empty_values_but_named_validators_run() {
		// Arrange
		let rule = FieldRule::new()
			.min_length(3, "short")
			.pattern(Regex::new(r"\d+").unwrap(), "digits")
			.validate("filled", |value| {
				if value.is_empty() {
					Err("must be filled".to_string())
				} else {
					Ok(())
				}
			});

		// Act
		let error = rule.evaluate(&FormValue::from("")).await;

		// Assert
		assert_eq!(
			error,
			Some(FieldError::new(
				ErrorKind::Validate("filled".to_string()),
				"must be filled"
			))
		);
	}

	#[tokio::test]
	async fn test_required_rejects_unchecked_box() {
		let rule = FieldRule::new().required("Accept the terms");
		assert!(rule.evaluate(&FormValue::Bool(false)).await.is_some());
		assert!(rule.evaluate(&FormValue::Bool(true)).await.is_none());
	}

	struct CountingValidator {
		calls: Arc<AtomicUsize>,
		verdict: Verdict,
	}

	#[async_trait]
	impl AsyncValidator for CountingValidator {
		async fn validate(&self, _value: Value) -> ValidationResult<Verdict> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(self.verdict.clone())
		}
	}

	#[tokio::test]
	async fn test_sync_failure_skips_async_validators() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let rule = FieldRule::new()
			.validate_async(
				"emailAvailable",
				CountingValidator {
					calls: calls.clone(),
					verdict: Ok(()),
				},
			)
			.validate("notAdmin", |value| {
				if value.as_str() == Some("admin@example.com") {
					Err("Nice try!".to_string())
				} else {
					Ok(())
				}
			});

		// Act
		let blocked = rule.evaluate(&FormValue::from("admin@example.com")).await;
		let passed = rule.evaluate(&FormValue::from("jane@example.com")).await;

		// Assert
		assert_eq!(blocked.map(|e| e.message), Some("Nice try!".to_string()));
		assert!(passed.is_none());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_first_async_failure_wins() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let rule = FieldRule::new()
			.validate_async(
				"first",
				CountingValidator {
					calls: calls.clone(),
					verdict: Err("first failed".to_string()),
				},
			)
			.validate_async(
				"second",
				CountingValidator {
					calls: calls.clone(),
					verdict: Err("second failed".to_string()),
				},
			);

		// Act
		let error = rule.evaluate(&FormValue::from("x")).await;

		// Assert
		assert_eq!(
			error,
			Some(FieldError::new(
				ErrorKind::Validate("first".to_string()),
				"first failed"
			))
		);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	struct Offline;

	#[async_trait]
	impl AsyncValidator for Offline {
		async fn validate(&self, _value: Value) -> ValidationResult<Verdict> {
			Err(ValidatorError::Rejected("network down".to_string()))
		}
	}

	#[tokio::test]
	async fn test_rejection_becomes_generic_failure() {
		// Arrange
		let rule = FieldRule::new().validate_async("emailAvailable", Offline);

		// Act
		let error = rule.evaluate(&FormValue::from("a@b.co")).await;

		// Assert
		assert_eq!(
			error,
			Some(FieldError::new(
				ErrorKind::Validate("emailAvailable".to_string()),
				REJECTED_VALIDATOR_MESSAGE
			))
		);
	}

	#[tokio::test]
	async fn test_disabled_rule_passes() {
		let rule = FieldRule::new().required("Twitter handle is required").disabled(true);
		assert!(rule.evaluate(&FormValue::Null).await.is_none());
	}

	#[test]
	fn test_error_kind_serializes_as_string() {
		let error = FieldError::new(ErrorKind::Validate("notAdmin".to_string()), "Nice try!");
		assert_eq!(
			serde_json::to_value(&error).unwrap(),
			serde_json::json!({"kind": "validate:notAdmin", "message": "Nice try!"})
		);
	}
}
