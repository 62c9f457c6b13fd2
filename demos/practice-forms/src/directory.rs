//! User directory behind the "email already taken" check.

use async_trait::async_trait;
use formwork::validators::{HttpLookupClient, LookupClient, LookupError, RemoteLookupValidator};
use serde_json::{Value, json};
use std::sync::Arc;

/// Public placeholder API the practice forms query.
pub const USERS_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/users";

pub const EMAIL_TAKEN_MESSAGE: &str = "This email is already taken";

/// In-memory directory used unless `--online` is given.
#[derive(Debug, Clone, Default)]
pub struct OfflineDirectory {
	taken: Vec<String>,
}

impl OfflineDirectory {
	pub fn new<I, S>(taken: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			taken: taken.into_iter().map(Into::into).collect(),
		}
	}

	/// Addresses of the first placeholder users.
	pub fn seeded() -> Self {
		Self::new(["Sincere@april.biz", "Shanna@melissa.tv", "Nathan@yesenia.net"])
	}
}

#[async_trait]
impl LookupClient for OfflineDirectory {
	async fn fetch_records(&self, url: &str) -> Result<Vec<Value>, LookupError> {
		let value = url.rsplit('/').next().unwrap_or_default();
		tracing::debug!(%url, "offline directory lookup");
		Ok(self
			.taken
			.iter()
			.filter(|email| email.eq_ignore_ascii_case(value))
			.map(|email| json!({ "email": email }))
			.collect())
	}
}

/// The `emailAvailable` validator, backed by HTTP when `online`.
pub fn email_lookup(online: bool) -> RemoteLookupValidator {
	let validator = if online {
		RemoteLookupValidator::new(USERS_ENDPOINT, Arc::new(HttpLookupClient::new()))
	} else {
		RemoteLookupValidator::new(USERS_ENDPOINT, Arc::new(OfflineDirectory::seeded()))
	};
	validator.with_message(EMAIL_TAKEN_MESSAGE)
}
