//! Errors reported for incorrect use of a form session.
//!
//! Validation failures are not errors: they live in the session's
//! [`FieldErrors`](crate::FieldErrors) map. [`FormError`] covers what a
//! caller did wrong, such as addressing a path that cannot exist.

use crate::field_array::EntryId;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
	#[error("Invalid field path {path:?}: {reason}")]
	InvalidPath { path: String, reason: String },
	#[error("Path conflict at {path}: {reason}")]
	PathConflict { path: String, reason: String },
	#[error("No field array is open at {0}")]
	UnknownFieldArray(String),
	#[error("Index {index} is out of bounds for field array {array} with {len} entries")]
	IndexOutOfBounds {
		array: String,
		index: usize,
		len: usize,
	},
	#[error("Entry {id} of field array {array} has been removed")]
	RemovedEntry { array: String, id: EntryId },
	#[error("A submission is already in progress")]
	SubmissionInProgress,
	#[error("Invalid form configuration: {0}")]
	Config(#[from] toml::de::Error),
}

pub type FormResult<T> = Result<T, FormError>;

impl FormError {
	pub(crate) fn conflict(path: impl ToString, reason: impl Into<String>) -> Self {
		Self::PathConflict {
			path: path.to_string(),
			reason: reason.into(),
		}
	}
}
