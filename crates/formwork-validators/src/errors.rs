//! Error types for validators that could not reach a verdict.
//!
//! A failing validation is not an error here: it is a [`Verdict`](crate::Verdict)
//! carrying the message to show next to the field. The types below describe the
//! case where the validator itself gave up, such as a lookup endpoint that was
//! unreachable.

use thiserror::Error;

/// Failure of a lookup request issued by a [`LookupClient`](crate::LookupClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
	/// The request could not be sent or no response arrived.
	#[error("Request to {url} failed: {message}")]
	Transport { url: String, message: String },

	/// The endpoint answered with a non-success status code.
	#[error("Request to {url} returned status {status}")]
	Status { url: String, status: u16 },

	/// The response body was not a JSON array.
	#[error("Response from {url} is not a JSON array: {message}")]
	Decode { url: String, message: String },
}

/// Rejection raised by an asynchronous validator.
///
/// The form session converts any rejection into a failed validation with a
/// generic message, so the details here only reach the logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
	#[error(transparent)]
	Lookup(#[from] LookupError),

	#[error("Validator rejected: {0}")]
	Rejected(String),
}

/// Result alias used by asynchronous validators.
pub type ValidationResult<T> = Result<T, ValidatorError>;
