//! The practice forms and their field rules.

use anyhow::Context as _;
use chrono::NaiveDate;
use formwork::forms::{
	FieldArray, FieldBinding, FieldRule, FormOptions, FormSession, FormValue, ValidationMode,
};
use formwork::validators::RemoteLookupValidator;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;

/// A session plus handles to its fields, addressed by path.
pub struct PracticeForm {
	pub session: FormSession,
	fields: BTreeMap<String, FieldBinding>,
	arrays: BTreeMap<String, FieldArray>,
}

impl PracticeForm {
	fn new(session: FormSession) -> Self {
		Self {
			session,
			fields: BTreeMap::new(),
			arrays: BTreeMap::new(),
		}
	}

	fn field(&mut self, path: &str, rule: FieldRule) -> anyhow::Result<()> {
		let binding = self
			.session
			.register(path, rule)
			.with_context(|| format!("registering {}", path))?;
		self.fields.insert(path.to_string(), binding);
		Ok(())
	}

	fn field_array(&mut self, name: &str) -> anyhow::Result<()> {
		let array = self.session.field_array(name)?;
		self.arrays.insert(name.to_string(), array);
		Ok(())
	}

	pub fn binding(&self, path: &str) -> anyhow::Result<&FieldBinding> {
		self.fields
			.get(path)
			.with_context(|| format!("the form has no field {}", path))
	}

	pub fn array(&self, name: &str) -> anyhow::Result<&FieldArray> {
		self.arrays
			.get(name)
			.with_context(|| format!("the form has no field array {}", name))
	}

	/// Type `value` into the field at `path` and leave it.
	pub async fn fill(&self, path: &str, value: &str) -> anyhow::Result<()> {
		let binding = self.binding(path)?;
		binding.on_change(value).await?;
		binding.on_blur().await?;
		Ok(())
	}

	/// Add an entry to a field array and type `value` into its `field`.
	pub async fn add_entry(&self, array: &str, field: &str, value: &str) -> anyhow::Result<()> {
		let array = self.array(array)?;
		let index = array.len();
		array.append(FormValue::object([(field, "")]))?;
		let binding = array.register(index, field, FieldRule::new())?;
		binding.on_change(value).await?;
		binding.on_blur().await?;
		Ok(())
	}
}

pub fn username_rule() -> FieldRule {
	FieldRule::new()
		.required("Username is required")
		.min_length(3, "Username must be at least 3 characters")
}

/// Email rules; `lookup` adds the `emailAvailable` check.
pub fn email_rule(lookup: Option<RemoteLookupValidator>) -> anyhow::Result<FieldRule> {
	let rule = FieldRule::new()
		.required("Email is required")
		.pattern(
			Regex::new(r"\S+@\S+\.\S+")?,
			"Please enter a valid email address",
		)
		.validate("notAdmin", |value: &FormValue| {
			if value.as_str() == Some("admin@example.com") {
				Err("Nice try!".to_string())
			} else {
				Ok(())
			}
		})
		.validate("notBlacklisted", |value: &FormValue| match value.as_str() {
			Some(email) if email.ends_with(".xyz") => {
				Err("We don't accept this type of email address".to_string())
			}
			_ => Ok(()),
		});
	Ok(match lookup {
		Some(lookup) => rule.validate_async("emailAvailable", lookup),
		None => rule,
	})
}

pub fn channel_rule() -> FieldRule {
	FieldRule::new()
		.required("Channel is required")
		.min_length(3, "Channel must be at least 3 characters")
}

fn handle_rule(network: &str) -> FieldRule {
	FieldRule::new()
		.required(format!("{} handle is required", network))
		.min_length(3, format!("{} handle must be at least 3 characters", network))
}

fn phone_rule(digits_only: bool) -> anyhow::Result<FieldRule> {
	let rule = FieldRule::new().required("Phone number is required");
	let rule = if digits_only {
		rule.pattern(Regex::new(r"\d+")?, "Please enter a valid phone number")
	} else {
		rule
	};
	Ok(rule.min_length(3, "Phone number must be at least 3 characters"))
}

/// Username, email and channel with no default values.
pub fn basic_form() -> anyhow::Result<PracticeForm> {
	let mut form = PracticeForm::new(FormSession::default());
	form.field("username", username_rule())?;
	form.field("email", email_rule(None)?)?;
	form.field("channel", channel_rule())?;
	Ok(form)
}

/// Nested social handles and a fixed pair of phone numbers.
pub fn advanced_form(lookup: RemoteLookupValidator) -> anyhow::Result<PracticeForm> {
	let session = FormSession::with_defaults(json!({
		"username": "",
		"email": "",
		"channel": "",
		"social": {"twitter": "", "facebook": ""},
		"phoneNumbers": ["", ""],
	}));
	let mut form = PracticeForm::new(session);
	form.field("username", username_rule())?;
	form.field("email", email_rule(Some(lookup))?)?;
	form.field("channel", channel_rule())?;
	form.field("social.twitter", handle_rule("Twitter"))?;
	form.field("social.facebook", handle_rule("Facebook"))?;
	form.field("phoneNumbers.0", phone_rule(false)?)?;
	form.field("phoneNumbers.1", phone_rule(true)?)?;
	Ok(form)
}

/// The advanced form plus age, date of birth and two field arrays.
///
/// Validates on blur, resets after a successful submission and keeps the
/// Twitter handle disabled.
pub fn dynamic_form(lookup: RemoteLookupValidator, today: NaiveDate) -> anyhow::Result<PracticeForm> {
	let mut defaults = FormValue::from(json!({
		"username": "",
		"email": "",
		"channel": "",
		"social": {"twitter": "", "facebook": ""},
		"phoneNumbers": ["", ""],
		"phNumbers": [],
		"items": [],
		"age": 0,
	}));
	defaults.set_path(&"dob".parse()?, FormValue::Date(today))?;

	let session = FormSession::new(
		FormOptions::new()
			.with_mode(ValidationMode::OnBlur)
			.with_default_values(defaults)
			.with_reset_on_submit_success(true),
	);
	let mut form = PracticeForm::new(session);
	form.field("username", username_rule())?;
	form.field("email", email_rule(Some(lookup))?)?;
	form.field(
		"age",
		FieldRule::new()
			.value_as_number()
			.required("Age is required")
			.min(18.0, "You must be at least 18 years old"),
	)?;
	form.field(
		"dob",
		FieldRule::new()
			.value_as_date()
			.required("Date of birth is required"),
	)?;
	form.field("channel", channel_rule())?;
	form.field("social.twitter", handle_rule("Twitter").disabled(true))?;
	form.field("social.facebook", handle_rule("Facebook"))?;
	form.field("phoneNumbers.0", phone_rule(false)?)?;
	form.field("phoneNumbers.1", phone_rule(true)?)?;
	form.field_array("phNumbers")?;
	form.field_array("items")?;
	Ok(form)
}

/// Unvalidated fields and the `testF` field array.
pub fn array_form() -> anyhow::Result<PracticeForm> {
	let session = FormSession::with_defaults(json!({
		"username": "",
		"email": "",
		"channel": "",
		"testF": [],
	}));
	let mut form = PracticeForm::new(session);
	for path in ["username", "email", "channel"] {
		form.field(path, FieldRule::new())?;
	}
	form.field_array("testF")?;
	Ok(form)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::directory::email_lookup;
	use formwork::forms::SubmitOutcome;
	use rstest::rstest;
	use std::cell::RefCell;

	fn today() -> NaiveDate {
		NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
	}

	async fn fill_dynamic(form: &PracticeForm, email: &str) {
		for (path, value) in [
			("username", "jane"),
			("email", email),
			("age", "30"),
			("dob", "1994-02-11"),
			("channel", "rustaceans"),
			("social.facebook", "jane.fb"),
			("phoneNumbers.0", "555-0100"),
			("phoneNumbers.1", "5550101"),
		] {
			form.fill(path, value).await.unwrap();
		}
	}

	#[rstest]
	#[case("", Some("Username is required"))]
	#[case("ab", Some("Username must be at least 3 characters"))]
	#[case("abcdef", None)]
	#[tokio::test]
	async fn test_basic_username(#[case] username: &str, #[case] expected: Option<&str>) {
		// Arrange
		let form = basic_form().unwrap();
		form.fill("username", username).await.unwrap();

		// Act
		form.session.trigger("username").await.unwrap();

		// Assert
		assert_eq!(
			form.session.error("username").map(|e| e.message),
			expected.map(str::to_string)
		);
	}

	#[rstest]
	#[case("jane@example.com", None)]
	#[case("jane@example.xyz", Some("We don't accept this type of email address"))]
	#[case("Sincere@april.biz", Some("This email is already taken"))]
	#[tokio::test]
	async fn test_dynamic_email_checks(#[case] email: &str, #[case] expected: Option<&str>) {
		// Arrange
		let form = dynamic_form(email_lookup(false), today()).unwrap();

		// Act
		form.fill("email", email).await.unwrap();

		// Assert
		assert_eq!(
			form.session.error("email").map(|e| e.message),
			expected.map(str::to_string)
		);
	}

	#[tokio::test]
	async fn test_dynamic_submission_skips_twitter_and_resets() {
		// Arrange
		let form = dynamic_form(email_lookup(false), today()).unwrap();
		fill_dynamic(&form, "jane@example.com").await;
		form.add_entry("phNumbers", "number", "0123").await.unwrap();
		let submitted = RefCell::new(None);

		// Act
		let outcome = form
			.session
			.handle_submit(|values| *submitted.borrow_mut() = Some(values.to_json()), |_| {})
			.await
			.unwrap();

		// Assert
		assert_eq!(outcome, SubmitOutcome::Valid);
		let values = submitted.into_inner().unwrap();
		assert_eq!(values["social"], json!({"facebook": "jane.fb"}));
		assert_eq!(values["age"], json!(30));
		assert_eq!(values["dob"], json!("1994-02-11"));
		assert_eq!(values["phNumbers"], json!([{"number": "0123"}]));
		assert_eq!(form.session.status().submit_count, 1);
		assert_eq!(form.array("phNumbers").unwrap().len(), 0);
		assert_eq!(form.session.get_value("username"), Some(FormValue::from("")));
	}

	#[tokio::test]
	async fn test_dynamic_age_below_minimum() {
		// Arrange
		let form = dynamic_form(email_lookup(false), today()).unwrap();

		// Act
		form.fill("age", "17").await.unwrap();

		// Assert
		assert_eq!(form.session.get_value("age"), Some(FormValue::Number(17.0)));
		assert_eq!(
			form.session.error("age").map(|e| e.message),
			Some("You must be at least 18 years old".to_string())
		);
	}

	#[tokio::test]
	async fn test_array_form_entries() {
		// Arrange
		let form = array_form().unwrap();

		// Act
		form.add_entry("testF", "test", "first").await.unwrap();
		form.add_entry("testF", "test", "second").await.unwrap();
		form.array("testF").unwrap().remove(0).unwrap();

		// Assert
		assert_eq!(
			form.session.get_value("testF").map(|v| v.to_json()),
			Some(json!([{"test": "second"}]))
		);
		assert!(form.session.status().is_dirty);
	}
}
