//! # Formwork
//!
//! Headless form state with declarative validation, field arrays and
//! asynchronous validators.
//!
//! A [`FormSession`](forms::FormSession) holds the values of one form together
//! with the rules, errors and touched/dirty marks of its fields. UI code feeds
//! it input events and renders whatever state it reports; nothing here draws
//! widgets.
//!
//! ## Feature Flags
//!
//! - `full` (default): everything below
//! - `forms`: form sessions ([`formwork_forms`])
//! - `remote`: the HTTP transport of the remote lookup validator
//!
//! The validator contract in [`validators`] is always available.
//!
//! ## Quick Example
//!
//! ```rust
//! use formwork::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let session = FormSession::with_defaults(json!({"username": ""}));
//! let username = session
//!     .register(
//!         "username",
//!         FieldRule::new()
//!             .required("Username is required")
//!             .min_length(3, "Username must be at least 3 characters"),
//!     )
//!     .unwrap();
//!
//! username.on_change("jane").await.unwrap();
//! let outcome = session
//!     .handle_submit(|values| println!("{}", values.to_json()), |_| {})
//!     .await
//!     .unwrap();
//! assert!(outcome.is_valid());
//! # });
//! ```

#[cfg(feature = "forms")]
pub mod forms;
pub mod validators;

/// Re-export commonly used types
pub mod prelude {
	pub use crate::validators::{
		AsyncValidator, FnValidator, LookupClient, LookupError, RemoteLookupValidator,
		ValidationResult, ValidatorError, Verdict,
	};

	#[cfg(feature = "remote")]
	pub use crate::validators::HttpLookupClient;

	#[cfg(feature = "forms")]
	pub use crate::forms::{
		FieldArray, FieldBinding, FieldError, FieldErrors, FieldRule, FormError, FormOptions,
		FormResult, FormSession, FormStatus, FormValue, ResetOptions, SetValueOptions,
		SubmitOutcome, ValidationMode, WatchEvent, WatchKind,
	};
}
