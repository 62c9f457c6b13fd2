//! Form sessions module.
//!
//! Values, validation rules, field arrays and watchers of a single form.
//!
//! # Examples
//!
//! ```rust
//! use formwork::forms::{FieldRule, FormSession};
//! use serde_json::json;
//!
//! let session = FormSession::with_defaults(json!({"username": ""}));
//! let username = session
//!     .register("username", FieldRule::new().required("Username is required"))
//!     .unwrap();
//! assert_eq!(username.name().as_deref(), Some("username"));
//! ```

#[cfg(feature = "forms")]
pub use formwork_forms::*;
