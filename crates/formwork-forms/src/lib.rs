//! # formwork-forms
//!
//! Headless form state for interactive UIs.
//!
//! A [`FormSession`] owns the values of one form, the rules of its registered
//! fields, their errors and the derived [`FormStatus`]. Input arrives through
//! [`FieldBinding`] handlers or [`FormSession::set_value`]; validation runs as
//! the configured [`ValidationMode`] dictates and always on
//! [`FormSession::handle_submit`]. Dynamic lists of entries are managed by
//! [`FieldArray`], which keeps stable [`EntryId`]s across reorders.
//!
//! Sessions are single-threaded (`!Send`). Asynchronous validators are awaited
//! on the caller's task; a result is only applied if no newer write or
//! validation of the same field started meanwhile.
//!
//! ## Quick start
//!
//! ```
//! use formwork_forms::{FieldRule, FormSession};
//! use serde_json::json;
//!
//! let session = FormSession::with_defaults(json!({
//!     "username": "",
//!     "phNumbers": [{"number": ""}],
//! }));
//! let username = session
//!     .register("username", FieldRule::new().required("Username is required"))
//!     .unwrap();
//! let numbers = session.field_array("phNumbers").unwrap();
//!
//! # tokio_test::block_on(async {
//! username.on_change("jane").await.unwrap();
//! numbers.append(json!({"number": "555"})).unwrap();
//!
//! let mut submitted = None;
//! session
//!     .handle_submit(|values| submitted = Some(values.to_json()), |_| {})
//!     .await
//!     .unwrap();
//! assert_eq!(
//!     submitted,
//!     Some(json!({"username": "jane", "phNumbers": [{"number": ""}, {"number": "555"}]}))
//! );
//! # });
//! ```

pub mod binding;
pub mod config;
pub mod error;
pub mod field_array;
pub mod path;
pub mod rule;
pub mod session;
pub mod snapshot;
mod state;
pub mod status;
pub mod validation;
pub mod value;
pub mod watch;

pub use binding::FieldBinding;
pub use config::{FormOptions, ResetOptions, SetValueOptions, ValidationMode};
pub use error::{FormError, FormResult};
pub use field_array::{EntryId, FieldArray, FieldArrayEntry};
pub use path::{FieldPath, Segment};
pub use rule::{Coercion, Constraint, FieldRule, SyncCheckFn};
pub use session::{FormSession, SubmitOutcome};
pub use snapshot::{FieldSnapshot, SessionSnapshot};
pub use status::FormStatus;
pub use validation::{ErrorKind, FieldError, FieldErrors, REJECTED_VALIDATOR_MESSAGE};
pub use value::FormValue;
pub use watch::{Subscription, WatchEvent, WatchKind};

pub use formwork_validators::{AsyncValidator, Verdict};
