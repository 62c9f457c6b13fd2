//! The form session handle.

use crate::binding::FieldBinding;
use crate::config::{FormOptions, ResetOptions, SetValueOptions};
use crate::error::{FormError, FormResult};
use crate::field_array::FieldArray;
use crate::path::FieldPath;
use crate::rule::FieldRule;
use crate::snapshot::SessionSnapshot;
use crate::state::{FieldKey, Location, SessionState};
use crate::status::FormStatus;
use crate::validation::{FieldError, FieldErrors};
use crate::value::FormValue;
use crate::watch::{ObserverList, Subscription, WatchEvent, WatchKind};
use futures::future::join_all;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Result of [`FormSession::handle_submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
	/// Every field passed and `on_valid` ran.
	Valid,
	/// Some field failed and `on_invalid` ran.
	Invalid,
}

impl SubmitOutcome {
	pub fn is_valid(self) -> bool {
		self == SubmitOutcome::Valid
	}
}

/// State of one form: values, rules, errors and derived status.
///
/// `FormSession` is a cheap handle; clones share the same state. It is meant
/// for a single-threaded UI and is therefore neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```
/// use formwork_forms::{FieldRule, FormOptions, FormSession, FormValue, SubmitOutcome};
/// use serde_json::json;
///
/// let session = FormSession::new(
///     FormOptions::new().with_default_values(json!({"username": ""})),
/// );
/// let username = session
///     .register(
///         "username",
///         FieldRule::new()
///             .required("Username is required")
///             .min_length(3, "Username must be at least 3 characters"),
///     )
///     .unwrap();
///
/// # tokio_test::block_on(async {
/// username.on_change("ab").await.unwrap();
/// let outcome = session.handle_submit(|_| {}, |_| {}).await.unwrap();
/// assert_eq!(outcome, SubmitOutcome::Invalid);
/// assert_eq!(
///     session.error("username").map(|e| e.message),
///     Some("Username must be at least 3 characters".to_string())
/// );
///
/// username.on_change("abcdef").await.unwrap();
/// let mut submitted = None;
/// session
///     .handle_submit(|values| submitted = Some(values), |_| {})
///     .await
///     .unwrap();
/// assert_eq!(submitted.unwrap().get("username"), Some(&FormValue::from("abcdef")));
/// assert_eq!(session.status().submit_count, 2);
/// # });
/// ```
#[derive(Clone)]
pub struct FormSession {
	state: Rc<RefCell<SessionState>>,
	observers: Rc<RefCell<ObserverList>>,
}

impl Default for FormSession {
	fn default() -> Self {
		Self::new(FormOptions::default())
	}
}

impl FormSession {
	pub fn new(options: FormOptions) -> Self {
		Self {
			state: Rc::new(RefCell::new(SessionState::new(options))),
			observers: Rc::new(RefCell::new(ObserverList::default())),
		}
	}

	/// A session in the default mode with the given default values.
	pub fn with_defaults(values: impl Into<FormValue>) -> Self {
		Self::new(FormOptions::new().with_default_values(values))
	}

	/// The options the session runs with. `default_values` reflects the
	/// latest defaults installed by a reset.
	pub fn options(&self) -> FormOptions {
		self.state().options.clone()
	}

	fn state(&self) -> Ref<'_, SessionState> {
		self.state.borrow()
	}

	fn state_mut(&self) -> RefMut<'_, SessionState> {
		self.state.borrow_mut()
	}

	pub(crate) fn with_state<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
		f(&self.state())
	}

	pub(crate) fn with_state_mut<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
		f(&mut self.state_mut())
	}

	// ---- registration ----

	/// Declare `path` as a field validated by `rule`.
	///
	/// Registering the same path again replaces its rule. Fails for malformed
	/// paths, paths running through a scalar value, field array roots and
	/// indices beyond a field array's length.
	pub fn register(&self, path: &str, rule: FieldRule) -> FormResult<FieldBinding> {
		let path = FieldPath::parse(path)?;
		let key = self.state_mut().register(&path, rule)?;
		tracing::debug!(field = %path, "registered field");
		Ok(FieldBinding::new(self.clone(), key))
	}

	/// Remove the rule of `path` with its error and marks. The value stays.
	pub fn unregister(&self, path: &str) -> FormResult<()> {
		let path = FieldPath::parse(path)?;
		let mut state = self.state_mut();
		let key = state.resolve_field(&path)?;
		state.unregister(&key);
		tracing::debug!(field = %path, "unregistered field");
		Ok(())
	}

	// ---- values ----

	/// Write `value` at `path`.
	///
	/// The field's coercion applies. Validation runs when `options` asks for
	/// it or when the active mode validates on change. Writing a field array
	/// root replaces its entries.
	pub async fn set_value(
		&self,
		path: &str,
		value: impl Into<FormValue>,
		options: SetValueOptions,
	) -> FormResult<()> {
		let path = FieldPath::parse(path)?;
		let value = value.into();

		let location = self.state().resolve(&path)?;
		match location {
			Location::ArrayRoot(array) => {
				let keys = {
					let mut state = self.state_mut();
					state.replace_entries(&array, value)?;
					let keys = state.keys_matching(&array);
					if options.should_touch {
						state.touched.extend(keys.iter().cloned());
					}
					keys
				};
				tracing::debug!(array = %array, "replaced field array through set_value");
				self.notify(Some(array.to_string()), WatchKind::SetValue);
				if options.should_validate {
					self.validate_keys(keys).await;
				}
				Ok(())
			}
			Location::Field(key) => {
				let intent = WriteIntent {
					dirty: options.should_dirty,
					touch: options.should_touch,
					validate: options.should_validate,
					kind: WatchKind::SetValue,
				};
				self.write_field(key, value, intent).await
			}
		}
	}

	/// Shared write path of `set_value` and field bindings.
	pub(crate) async fn write_field(
		&self,
		key: FieldKey,
		value: FormValue,
		intent: WriteIntent,
	) -> FormResult<()> {
		let (validate, name) = {
			let mut state = self.state_mut();
			let coercion = state
				.rules
				.get(&key)
				.map(FieldRule::coercion)
				.unwrap_or_default();
			state.write(&key, coercion.apply(value))?;
			state.bump(&key);
			if intent.dirty {
				state.update_dirty(&key);
			}
			if intent.touch {
				state.touched.insert(key.clone());
			}
			let validate = intent.validate || state.change_validates(&key);
			(validate, state.display(&key))
		};
		tracing::debug!(field = ?name, validate, "value written");

		self.notify(name, intent.kind);
		if validate {
			self.validate_keys(vec![key]).await;
		}
		Ok(())
	}

	/// The value at `path`, if any. Malformed paths yield `None`.
	pub fn get_value(&self, path: &str) -> Option<FormValue> {
		let path = FieldPath::parse(path).ok()?;
		self.state().compose().get_path(&path).cloned()
	}

	/// Values at several paths, in the order given.
	pub fn get_values(&self, paths: &[&str]) -> Vec<Option<FormValue>> {
		let values = self.values();
		paths
			.iter()
			.map(|raw| {
				let path = FieldPath::parse(raw).ok()?;
				values.get_path(&path).cloned()
			})
			.collect()
	}

	/// The whole value tree.
	pub fn values(&self) -> FormValue {
		self.state().compose()
	}

	// ---- validation ----

	/// Validate the fields at or below `path`, whatever the mode.
	///
	/// Resolves to `true` when all of them pass. Paths without registered
	/// fields are trivially valid.
	pub async fn trigger(&self, path: &str) -> FormResult<bool> {
		self.trigger_many(&[path]).await
	}

	pub async fn trigger_many(&self, paths: &[&str]) -> FormResult<bool> {
		let keys = {
			let state = self.state();
			let mut keys = BTreeSet::new();
			for raw in paths {
				let path = FieldPath::parse(raw)?;
				keys.extend(state.keys_matching(&path));
			}
			keys
		};
		Ok(self.validate_keys(keys.into_iter().collect()).await)
	}

	/// Validate every registered field.
	pub async fn trigger_all(&self) -> bool {
		let keys: Vec<FieldKey> = self.state().rules.keys().cloned().collect();
		self.validate_keys(keys).await
	}

	/// Run the pipelines of `keys` concurrently and commit their results.
	///
	/// A result only commits if no later write or validation of the same field
	/// started in the meantime. Returns whether every key ended up without an
	/// error.
	pub(crate) async fn validate_keys(&self, keys: Vec<FieldKey>) -> bool {
		self.run_validation(keys).await.all_valid
	}

	async fn run_validation(&self, keys: Vec<FieldKey>) -> ValidationRun {
		let jobs = {
			let mut state = self.state_mut();
			let mut jobs = Vec::with_capacity(keys.len());
			for key in keys {
				let Some(rule) = state.rules.get(&key).cloned() else {
					continue;
				};
				if rule.is_disabled() {
					state.errors.remove(&key);
					continue;
				}
				let value = state.read(&key).unwrap_or_default();
				let generation = state.bump(&key);
				jobs.push((key, rule, value, generation));
			}
			state.validating += jobs.len();
			jobs
		};
		if jobs.is_empty() {
			return ValidationRun {
				all_valid: true,
				stale: Vec::new(),
			};
		}

		let in_flight = InFlight::validating(&self.state, jobs.len());
		let results = join_all(jobs.into_iter().map(|(key, rule, value, generation)| async move {
			let outcome = rule.evaluate(&value).await;
			(key, generation, outcome)
		}))
		.await;
		drop(in_flight);

		let mut state = self.state_mut();
		let mut run = ValidationRun {
			all_valid: true,
			stale: Vec::new(),
		};
		for (key, generation, outcome) in results {
			if !state.is_current(&key, generation) {
				tracing::debug!(field = ?state.display(&key), "discarding stale validation result");
				run.all_valid &= !state.errors.contains_key(&key);
				run.stale.push(key);
				continue;
			}
			match outcome {
				Some(error) => {
					tracing::debug!(field = ?state.display(&key), kind = %error.kind, "field invalid");
					state.errors.insert(key, error);
					run.all_valid = false;
				}
				None => {
					state.errors.remove(&key);
				}
			}
		}
		run
	}

	/// Validate everything and hand the values to `on_valid`, or the errors to
	/// `on_invalid`.
	///
	/// Fields written while the submission validates are validated again, so
	/// `on_valid` only ever sees values that passed their rules. Disabled
	/// fields are left out of the submitted values. Fails with
	/// [`FormError::SubmissionInProgress`] while another submission of the same
	/// session is running. Dropping the returned future ends the submission.
	pub async fn handle_submit<V, I>(&self, on_valid: V, on_invalid: I) -> FormResult<SubmitOutcome>
	where
		V: FnOnce(FormValue),
		I: FnOnce(&FieldErrors),
	{
		{
			let mut state = self.state_mut();
			if state.submitting {
				tracing::warn!("submission rejected: another submission is in progress");
				return Err(FormError::SubmissionInProgress);
			}
			state.submitting = true;
		}
		let in_flight = InFlight::submitting(&self.state);
		tracing::debug!("submission started");

		let keys: Vec<FieldKey> = self.state().rules.keys().cloned().collect();
		let mut run = self.run_validation(keys).await;
		while !run.stale.is_empty() {
			tracing::debug!(fields = run.stale.len(), "revalidating fields written during submission");
			run = self.run_validation(run.stale).await;
		}

		let verdict = {
			let mut state = self.state_mut();
			state.submit_count += 1;
			state.submitted = true;
			if state.errors.is_empty() {
				Ok(state.submission_values())
			} else {
				Err(state.field_errors())
			}
		};

		let outcome = match verdict {
			Ok(values) => {
				on_valid(values);
				SubmitOutcome::Valid
			}
			Err(errors) => {
				on_invalid(&errors);
				SubmitOutcome::Invalid
			}
		};

		drop(in_flight);
		let reset = {
			let mut state = self.state_mut();
			state.submit_successful = outcome.is_valid();
			outcome.is_valid() && state.options.reset_on_submit_success
		};
		tracing::debug!(outcome = ?outcome, "submission finished");

		if reset {
			self.reset_with(
				None,
				ResetOptions {
					keep_submit_count: true,
					..ResetOptions::default()
				},
			);
		}
		Ok(outcome)
	}

	// ---- errors & marks ----

	pub fn errors(&self) -> FieldErrors {
		self.state().field_errors()
	}

	pub fn error(&self, path: &str) -> Option<FieldError> {
		let key = self.key_of(path)?;
		self.state().errors.get(&key).cloned()
	}

	/// Record an error for `path` by hand. Field array roots accept errors too.
	pub fn set_error(&self, path: &str, error: FieldError) -> FormResult<()> {
		let path = FieldPath::parse(path)?;
		let mut state = self.state_mut();
		let key = match state.resolve(&path)? {
			Location::Field(key) => key,
			Location::ArrayRoot(array) => FieldKey::Path(array),
		};
		state.errors.insert(key, error);
		Ok(())
	}

	/// Clear errors at or below each of `paths`.
	pub fn clear_errors(&self, paths: &[&str]) -> FormResult<()> {
		let mut state = self.state_mut();
		for raw in paths {
			let path = FieldPath::parse(raw)?;
			let keys: Vec<FieldKey> = state
				.errors
				.keys()
				.filter(|key| {
					state
						.current_path(key)
						.is_some_and(|current| current.starts_with(&path))
				})
				.cloned()
				.collect();
			for key in keys {
				state.errors.remove(&key);
			}
		}
		Ok(())
	}

	pub fn clear_all_errors(&self) {
		self.state_mut().errors.clear();
	}

	pub fn is_touched(&self, path: &str) -> bool {
		self.key_of(path)
			.is_some_and(|key| self.state().touched.contains(&key))
	}

	pub fn is_field_dirty(&self, path: &str) -> bool {
		self.key_of(path)
			.is_some_and(|key| self.state().dirty.contains(&key))
	}

	/// Paths of fields marked dirty.
	pub fn dirty_fields(&self) -> Vec<String> {
		let state = self.state();
		state.dirty.iter().filter_map(|key| state.display(key)).collect()
	}

	/// Paths of fields marked touched.
	pub fn touched_fields(&self) -> Vec<String> {
		let state = self.state();
		state
			.touched
			.iter()
			.filter_map(|key| state.display(key))
			.collect()
	}

	fn key_of(&self, path: &str) -> Option<FieldKey> {
		let path = FieldPath::parse(path).ok()?;
		self.state().resolve_field(&path).ok()
	}

	pub fn status(&self) -> FormStatus {
		self.state().status()
	}

	// ---- watchers ----

	/// Call `callback` after every committed value change.
	pub fn watch<F>(&self, callback: F) -> Subscription
	where
		F: Fn(&FormValue, &WatchEvent) + 'static,
	{
		let id = self.observers.borrow_mut().add(Rc::new(callback));
		Subscription::new(id, &self.observers)
	}

	/// Call `callback` with the value at `path` whenever it may have changed.
	pub fn watch_path<F>(&self, path: &str, callback: F) -> FormResult<Subscription>
	where
		F: Fn(Option<&FormValue>) + 'static,
	{
		let path = FieldPath::parse(path)?;
		Ok(self.watch(move |values, event| {
			let related = match &event.name {
				None => true,
				Some(name) => FieldPath::parse(name)
					.is_ok_and(|changed| changed.starts_with(&path) || path.starts_with(&changed)),
			};
			if related {
				callback(values.get_path(&path));
			}
		}))
	}

	pub(crate) fn notify(&self, name: Option<String>, kind: WatchKind) {
		let observers = self.observers.borrow().snapshot();
		if observers.is_empty() {
			return;
		}
		let values = self.values();
		let event = WatchEvent { name, kind };
		for observer in observers {
			observer(&values, &event);
		}
	}

	// ---- reset ----

	/// Restore the defaults and clear errors, marks and submission state,
	/// including the submit count.
	pub fn reset(&self) {
		self.reset_with(None, ResetOptions::default());
	}

	/// Reset to `values` (which become the new defaults unless
	/// `options.keep_default_values`), or to the current defaults when `None`.
	pub fn reset_with(&self, values: Option<FormValue>, options: ResetOptions) {
		self.state_mut().reset(values, options);
		tracing::debug!(keep_submit_count = options.keep_submit_count, "session reset");
		self.notify(None, WatchKind::Reset);
	}

	// ---- field arrays & devtools ----

	/// Open the field array at `name`. Opening the same name again returns a
	/// handle to the same entries.
	pub fn field_array(&self, name: &str) -> FormResult<FieldArray> {
		let path = FieldPath::parse(name)?;
		self.state_mut().open_array(&path)?;
		Ok(FieldArray::new(self.clone(), path))
	}

	/// Read-only view of the whole session for devtools.
	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot::capture(&self.state())
	}
}

impl std::fmt::Debug for FormSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FormSession")
			.field("values", &self.values())
			.field("status", &self.status())
			.finish_non_exhaustive()
	}
}

/// How a write should update marks and validation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WriteIntent {
	pub(crate) dirty: bool,
	pub(crate) touch: bool,
	/// Validate regardless of mode.
	pub(crate) validate: bool,
	pub(crate) kind: WatchKind,
}

struct ValidationRun {
	all_valid: bool,
	/// Keys whose result was discarded because the field changed meanwhile.
	stale: Vec<FieldKey>,
}

/// Undoes the busy flags of a validation or submission when it settles or
/// its future is dropped.
struct InFlight {
	state: Rc<RefCell<SessionState>>,
	validating: usize,
	submitting: bool,
}

impl InFlight {
	fn validating(state: &Rc<RefCell<SessionState>>, count: usize) -> Self {
		Self {
			state: Rc::clone(state),
			validating: count,
			submitting: false,
		}
	}

	fn submitting(state: &Rc<RefCell<SessionState>>) -> Self {
		Self {
			state: Rc::clone(state),
			validating: 0,
			submitting: true,
		}
	}
}

impl Drop for InFlight {
	fn drop(&mut self) {
		match self.state.try_borrow_mut() {
			Ok(mut state) => {
				state.validating = state.validating.saturating_sub(self.validating);
				if self.submitting {
					state.submitting = false;
				}
			}
			Err(_) => tracing::error!("session state busy while settling in-flight work"),
		}
	}
}
