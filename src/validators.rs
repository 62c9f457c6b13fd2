//! Asynchronous validators module.
//!
//! The [`AsyncValidator`] contract and the remote lookup validator.
//!
//! # Examples
//!
//! ```rust,no_run
//! use formwork::validators::{AsyncValidator, RemoteLookupValidator};
//! ```

pub use formwork_validators::*;
