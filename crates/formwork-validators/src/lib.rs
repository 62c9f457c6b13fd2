//! Validation primitives for formwork
//!
//! This crate defines the contract for validators that must await before
//! deciding, such as "is this email already registered?", together with a
//! ready-made [`RemoteLookupValidator`] that asks an HTTP endpoint.
//!
//! Validators work on `serde_json::Value` views of field values so that they
//! stay independent from the form session that drives them.
//!
//! ## Feature Flags
//!
//! - `remote` (default): [`HttpLookupClient`], the `reqwest` backed transport.

pub mod async_validator;
pub mod errors;
pub mod remote;

pub use async_validator::{AsyncCheckFn, AsyncValidator, FnValidator};
pub use errors::{LookupError, ValidationResult, ValidatorError};
#[cfg(feature = "remote")]
pub use remote::HttpLookupClient;
pub use remote::{DEFAULT_TAKEN_MESSAGE, LookupClient, RemoteLookupValidator};

/// Outcome of a validator that reached a decision.
///
/// `Ok(())` accepts the value, `Err(message)` fails it with a message meant
/// for the user.
pub type Verdict = Result<(), String>;

/// Re-export commonly used types
pub mod prelude {
	pub use super::Verdict;
	pub use super::async_validator::{AsyncValidator, FnValidator};
	pub use super::errors::{LookupError, ValidationResult, ValidatorError};
	#[cfg(feature = "remote")]
	pub use super::remote::HttpLookupClient;
	pub use super::remote::{LookupClient, RemoteLookupValidator};
}
