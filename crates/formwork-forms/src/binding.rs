//! Handles returned by field registration.

use crate::error::{FormError, FormResult};
use crate::session::{FormSession, WriteIntent};
use crate::state::FieldKey;
use crate::validation::FieldError;
use crate::value::FormValue;
use crate::watch::WatchKind;

/// What an input element needs from the session: its current value, its error
/// and the two event handlers.
///
/// Bindings follow their field through field array reorders. Once the entry
/// of an array field is removed, reads return `None`/`false` and events fail
/// with [`FormError::RemovedEntry`].
#[derive(Clone)]
pub struct FieldBinding {
	session: FormSession,
	key: FieldKey,
}

impl FieldBinding {
	pub(crate) fn new(session: FormSession, key: FieldKey) -> Self {
		Self { session, key }
	}

	/// Current path of the field, e.g. `phNumbers.1.number`.
	pub fn name(&self) -> Option<String> {
		self.session.with_state(|state| state.display(&self.key))
	}

	pub fn value(&self) -> Option<FormValue> {
		self.session.with_state(|state| state.read(&self.key))
	}

	pub fn is_disabled(&self) -> bool {
		self.session.with_state(|state| {
			state
				.rules
				.get(&self.key)
				.is_some_and(|rule| rule.is_disabled())
		})
	}

	pub fn error(&self) -> Option<FieldError> {
		self.session
			.with_state(|state| state.errors.get(&self.key).cloned())
	}

	pub fn is_touched(&self) -> bool {
		self.session
			.with_state(|state| state.touched.contains(&self.key))
	}

	pub fn is_dirty(&self) -> bool {
		self.session
			.with_state(|state| state.dirty.contains(&self.key))
	}

	/// User input. Ignored while the field is disabled.
	pub async fn on_change(&self, raw: impl Into<FormValue>) -> FormResult<()> {
		if self.is_disabled() {
			tracing::trace!(field = ?self.name(), "ignoring input to disabled field");
			return Ok(());
		}
		let intent = WriteIntent {
			dirty: true,
			touch: false,
			validate: false,
			kind: WatchKind::Change,
		};
		self.session
			.write_field(self.key.clone(), raw.into(), intent)
			.await
	}

	/// The field lost focus: mark it touched and validate when the mode asks.
	pub async fn on_blur(&self) -> FormResult<()> {
		let validate = self.session.with_state_mut(|state| {
			if state.current_path(&self.key).is_none() {
				return Err(self.removed());
			}
			state.touched.insert(self.key.clone());
			Ok(state.blur_validates(&self.key))
		})?;
		if validate {
			self.session.validate_keys(vec![self.key.clone()]).await;
		}
		Ok(())
	}

	fn removed(&self) -> FormError {
		match &self.key {
			FieldKey::Entry { array, id, .. } => FormError::RemovedEntry {
				array: array.to_string(),
				id: *id,
			},
			FieldKey::Path(path) => FormError::conflict(path, "field is no longer addressable"),
		}
	}
}

impl std::fmt::Debug for FieldBinding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldBinding")
			.field("key", &self.key)
			.finish_non_exhaustive()
	}
}
