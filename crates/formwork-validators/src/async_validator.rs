//! The asynchronous validator contract.

use crate::Verdict;
use crate::errors::ValidationResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;

/// A named validator that needs to await something, usually a remote lookup.
///
/// `validate` resolves to `Ok(verdict)` when the validator reached a decision
/// and to `Err` when it could not. The caller never retries a rejection.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use formwork_validators::{AsyncValidator, ValidationResult, Verdict};
/// use serde_json::Value;
///
/// struct NotEmpty;
///
/// #[async_trait]
/// impl AsyncValidator for NotEmpty {
///     async fn validate(&self, value: Value) -> ValidationResult<Verdict> {
///         match value.as_str() {
///             Some(text) if !text.is_empty() => Ok(Ok(())),
///             _ => Ok(Err("Must not be empty".to_string())),
///         }
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let verdict = NotEmpty.validate(Value::from("x")).await.unwrap();
/// assert!(verdict.is_ok());
/// # });
/// ```
#[async_trait]
pub trait AsyncValidator: Send + Sync {
	/// Decide whether `value` is acceptable.
	async fn validate(&self, value: Value) -> ValidationResult<Verdict>;
}

/// Type alias for the boxed check function wrapped by [`FnValidator`]
pub type AsyncCheckFn =
	Box<dyn Fn(Value) -> BoxFuture<'static, ValidationResult<Verdict>> + Send + Sync>;

/// Adapter turning an async closure into an [`AsyncValidator`].
///
/// # Examples
///
/// ```rust
/// use formwork_validators::{AsyncValidator, FnValidator};
/// use serde_json::Value;
///
/// let validator = FnValidator::new(|value: Value| async move {
///     if value.as_str() == Some("taken") {
///         Ok(Err("Already taken".to_string()))
///     } else {
///         Ok(Ok(()))
///     }
/// });
///
/// # tokio_test::block_on(async {
/// let verdict = validator.validate(Value::from("taken")).await.unwrap();
/// assert_eq!(verdict, Err("Already taken".to_string()));
/// # });
/// ```
pub struct FnValidator {
	check_fn: AsyncCheckFn,
}

impl FnValidator {
	/// Wrap `check` so that each call is boxed into a `'static` future.
	pub fn new<F, Fut>(check: F) -> Self
	where
		F: Fn(Value) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = ValidationResult<Verdict>> + Send + 'static,
	{
		Self {
			check_fn: Box::new(move |value| Box::pin(check(value))),
		}
	}

	/// Wrap an already boxed check function.
	pub fn from_boxed(check_fn: AsyncCheckFn) -> Self {
		Self { check_fn }
	}
}

impl std::fmt::Debug for FnValidator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FnValidator").finish_non_exhaustive()
	}
}

#[async_trait]
impl AsyncValidator for FnValidator {
	async fn validate(&self, value: Value) -> ValidationResult<Verdict> {
		(self.check_fn)(value).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::errors::ValidatorError;
	use std::collections::HashSet;
	use std::sync::{Arc, Mutex};

	#[tokio::test]
	async fn test_fn_validator_reports_taken_values() {
		// Arrange
		let taken = Arc::new(Mutex::new(HashSet::from(["admin".to_string()])));
		let validator = FnValidator::new(move |value: Value| {
			let taken = taken.clone();
			async move {
				let name = value.as_str().unwrap_or_default().to_string();
				if taken.lock().unwrap().contains(&name) {
					Ok(Err(format!("{} is taken", name)))
				} else {
					Ok(Ok(()))
				}
			}
		});

		// Act
		let free = validator.validate(Value::from("guest")).await;
		let used = validator.validate(Value::from("admin")).await;

		// Assert
		assert_eq!(free, Ok(Ok(())));
		assert_eq!(used, Ok(Err("admin is taken".to_string())));
	}

	#[tokio::test]
	async fn test_fn_validator_passes_rejections_through() {
		// Arrange
		let validator = FnValidator::from_boxed(Box::new(|_value| {
			Box::pin(async { Err(ValidatorError::Rejected("offline".to_string())) })
		}));

		// Act
		let result = validator.validate(Value::Null).await;

		// Assert
		assert_eq!(result, Err(ValidatorError::Rejected("offline".to_string())));
	}
}
