//! Derived form status.

use serde::Serialize;

/// Flags derived from a session's state.
///
/// `is_valid` only reflects errors recorded so far: a field that has never
/// been validated does not make the form invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FormStatus {
	/// The values differ from the defaults.
	pub is_dirty: bool,
	/// No field currently carries an error.
	pub is_valid: bool,
	/// An asynchronous validation is in flight.
	pub is_validating: bool,
	pub is_submitting: bool,
	pub is_submitted: bool,
	pub is_submit_successful: bool,
	/// Number of submission attempts since creation or the last reset that
	/// did not keep it.
	pub submit_count: u32,
}

impl FormStatus {
	/// Whether a submit button should be enabled: something changed, nothing
	/// is known to be invalid and no submission is running.
	pub fn can_submit(&self) -> bool {
		self.is_dirty && self.is_valid && !self.is_submitting
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(true, true, false, true)]
	#[case(false, true, false, false)]
	#[case(true, false, false, false)]
	#[case(true, true, true, false)]
	fn test_can_submit(
		#[case] is_dirty: bool,
		#[case] is_valid: bool,
		#[case] is_submitting: bool,
		#[case] expected: bool,
	) {
		// Arrange
		let status = FormStatus {
			is_dirty,
			is_valid,
			is_submitting,
			..FormStatus::default()
		};

		// Act & Assert
		assert_eq!(status.can_submit(), expected);
	}
}
