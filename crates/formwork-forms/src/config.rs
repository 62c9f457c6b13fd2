//! Session configuration.
//!
//! [`FormOptions`] can be built in code or loaded from TOML:
//!
//! ```
//! use formwork_forms::{FormOptions, FormValue, ValidationMode};
//!
//! let options = FormOptions::from_toml_str(
//!     r#"
//!     mode = "onBlur"
//!     reset_on_submit_success = true
//!
//!     [default_values]
//!     username = ""
//!     phoneNumbers = ["", ""]
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(options.mode, ValidationMode::OnBlur);
//! assert_eq!(options.default_values.get("username"), Some(&FormValue::from("")));
//! ```

use crate::error::{FormError, FormResult};
use crate::value::FormValue;
use serde::{Deserialize, Serialize};

/// When field events validate implicitly.
///
/// `trigger` and `handle_submit` validate regardless of the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
	/// Only submission validates.
	#[default]
	OnSubmit,
	/// Every value change validates the changed field.
	OnChange,
	/// Leaving a field validates it.
	OnBlur,
	/// The first blur validates, then every change does.
	OnTouched,
	/// Both changes and blurs validate.
	All,
}

impl ValidationMode {
	/// Whether a value change validates a field whose touched flag is `touched`.
	pub fn validates_on_change(self, touched: bool) -> bool {
		match self {
			ValidationMode::OnChange | ValidationMode::All => true,
			ValidationMode::OnTouched => touched,
			ValidationMode::OnSubmit | ValidationMode::OnBlur => false,
		}
	}

	pub fn validates_on_blur(self) -> bool {
		matches!(
			self,
			ValidationMode::OnBlur | ValidationMode::OnTouched | ValidationMode::All
		)
	}
}

/// Options a session is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
	/// Validation mode before the first submission.
	pub mode: ValidationMode,
	/// Validation mode after the first submission.
	pub revalidate_mode: ValidationMode,
	/// Initial values; also what `reset` restores.
	pub default_values: FormValue,
	/// Reset the session after a successful submission.
	pub reset_on_submit_success: bool,
}

impl Default for FormOptions {
	fn default() -> Self {
		Self {
			mode: ValidationMode::OnSubmit,
			revalidate_mode: ValidationMode::OnChange,
			default_values: FormValue::map(),
			reset_on_submit_success: false,
		}
	}
}

impl FormOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_mode(mut self, mode: ValidationMode) -> Self {
		self.mode = mode;
		self
	}

	pub fn with_revalidate_mode(mut self, mode: ValidationMode) -> Self {
		self.revalidate_mode = mode;
		self
	}

	pub fn with_default_values(mut self, values: impl Into<FormValue>) -> Self {
		self.default_values = values.into();
		self
	}

	pub fn with_reset_on_submit_success(mut self, reset: bool) -> Self {
		self.reset_on_submit_success = reset;
		self
	}

	/// Parse options from TOML.
	///
	/// `default_values` must be a table when present.
	pub fn from_toml_str(source: &str) -> FormResult<Self> {
		let options: FormOptions = toml::from_str(source)?;
		if options.default_values.as_map().is_none() {
			return Err(FormError::conflict(
				"default_values",
				"default values must be a table",
			));
		}
		Ok(options)
	}
}

/// Flags for [`FormSession::set_value`](crate::FormSession::set_value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetValueOptions {
	/// Validate the field after writing, whatever the mode.
	pub should_validate: bool,
	/// Update the field's dirty mark by comparing against its default.
	pub should_dirty: bool,
	/// Mark the field as touched.
	pub should_touch: bool,
}

impl SetValueOptions {
	/// All three flags set.
	pub fn all() -> Self {
		Self {
			should_validate: true,
			should_dirty: true,
			should_touch: true,
		}
	}

	pub fn validate(mut self) -> Self {
		self.should_validate = true;
		self
	}

	pub fn dirty(mut self) -> Self {
		self.should_dirty = true;
		self
	}

	pub fn touch(mut self) -> Self {
		self.should_touch = true;
		self
	}
}

/// What [`FormSession::reset_with`](crate::FormSession::reset_with) keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetOptions {
	pub keep_submit_count: bool,
	pub keep_errors: bool,
	pub keep_touched: bool,
	/// Keep the current defaults even when new values are passed.
	pub keep_default_values: bool,
}
