//! Availability checks backed by a remote lookup endpoint.
//!
//! [`RemoteLookupValidator`] sends `GET <endpoint>/<value>` and expects a JSON
//! array of matching records. An empty array means the value is still
//! available; any match fails the field with the configured message.

use crate::Verdict;
use crate::async_validator::AsyncValidator;
use crate::errors::{LookupError, ValidationResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Default failure message of [`RemoteLookupValidator`].
pub const DEFAULT_TAKEN_MESSAGE: &str = "This value is already taken";

/// Transport used by [`RemoteLookupValidator`].
///
/// Production code uses [`HttpLookupClient`]; tests provide an in-memory
/// implementation.
#[async_trait]
pub trait LookupClient: Send + Sync {
	/// Fetch `url` and decode the body as a JSON array.
	async fn fetch_records(&self, url: &str) -> Result<Vec<Value>, LookupError>;
}

/// Asynchronous validator that fails when the lookup endpoint knows the value.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use formwork_validators::{AsyncValidator, LookupClient, LookupError, RemoteLookupValidator};
/// use serde_json::{Value, json};
/// use std::sync::Arc;
///
/// struct Directory;
///
/// #[async_trait]
/// impl LookupClient for Directory {
///     async fn fetch_records(&self, url: &str) -> Result<Vec<Value>, LookupError> {
///         if url.ends_with("/taken@example.com") {
///             Ok(vec![json!({"id": 1})])
///         } else {
///             Ok(Vec::new())
///         }
///     }
/// }
///
/// let validator = RemoteLookupValidator::new("https://directory.test/users", Arc::new(Directory))
///     .with_message("This email is already taken");
///
/// # tokio_test::block_on(async {
/// let verdict = validator.validate(Value::from("taken@example.com")).await.unwrap();
/// assert_eq!(verdict, Err("This email is already taken".to_string()));
/// # });
/// ```
#[derive(Clone)]
pub struct RemoteLookupValidator {
	endpoint: String,
	client: Arc<dyn LookupClient>,
	message: String,
}

impl RemoteLookupValidator {
	/// Create a validator querying `endpoint` through `client`.
	///
	/// A trailing slash on `endpoint` is ignored.
	pub fn new(endpoint: impl Into<String>, client: Arc<dyn LookupClient>) -> Self {
		let endpoint = endpoint.into();
		Self {
			endpoint: endpoint.trim_end_matches('/').to_string(),
			client,
			message: DEFAULT_TAKEN_MESSAGE.to_string(),
		}
	}

	/// Create a validator that uses [`HttpLookupClient`].
	#[cfg(feature = "remote")]
	pub fn http(endpoint: impl Into<String>) -> Self {
		Self::new(endpoint, Arc::new(HttpLookupClient::new()))
	}

	/// Set the message reported when the value is already known.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = message.into();
		self
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	/// The URL queried for `value`.
	///
	/// The value is appended verbatim, without percent-encoding, so that the
	/// endpoint sees exactly what the user typed.
	pub fn lookup_url(&self, value: &Value) -> String {
		let segment = match value {
			Value::Null => String::new(),
			Value::String(text) => text.clone(),
			other => other.to_string(),
		};
		format!("{}/{}", self.endpoint, segment)
	}
}

impl std::fmt::Debug for RemoteLookupValidator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RemoteLookupValidator")
			.field("endpoint", &self.endpoint)
			.field("message", &self.message)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl AsyncValidator for RemoteLookupValidator {
	async fn validate(&self, value: Value) -> ValidationResult<Verdict> {
		let url = self.lookup_url(&value);
		let records = self.client.fetch_records(&url).await?;
		tracing::debug!(url = %url, matches = records.len(), "remote lookup finished");

		if records.is_empty() {
			Ok(Ok(()))
		} else {
			Ok(Err(self.message.clone()))
		}
	}
}

/// [`LookupClient`] performing real HTTP requests with `reqwest`.
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Default)]
pub struct HttpLookupClient {
	client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpLookupClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reuse an existing `reqwest` client (shared connection pool, timeouts).
	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

#[cfg(feature = "remote")]
#[async_trait]
impl LookupClient for HttpLookupClient {
	async fn fetch_records(&self, url: &str) -> Result<Vec<Value>, LookupError> {
		let response =
			self.client
				.get(url)
				.send()
				.await
				.map_err(|e| LookupError::Transport {
					url: url.to_string(),
					message: e.to_string(),
				})?;

		let status = response.status();
		if !status.is_success() {
			return Err(LookupError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}

		response
			.json::<Vec<Value>>()
			.await
			.map_err(|e| LookupError::Decode {
				url: url.to_string(),
				message: e.to_string(),
			})
	}
}
